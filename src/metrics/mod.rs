pub mod collector;
pub mod exporter;

pub use collector::BalanceMetrics;
pub use exporter::{export_metrics, TEXT_CONTENT_TYPE};
