pub mod balance;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod updater;

pub use config::{Credentials, ExporterConfig};
pub use error::ExporterError;
pub use metrics::BalanceMetrics;
pub use server::MetricsServer;
pub use updater::BalanceUpdater;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
