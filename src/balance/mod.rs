pub mod fetcher;

pub use fetcher::HttpBalanceSource;

use crate::config::Credentials;
use crate::error::{ExporterError, Result};
use async_trait::async_trait;

/// Something that can answer a balance inquiry with the raw balance text.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch the balance text. Errors must already be redacted.
    async fn fetch_balance(&self) -> Result<String>;
}

/// Parse the balance text returned by the billing API.
pub fn parse_balance(text: &str, credentials: &Credentials) -> Result<f64> {
    text.trim().parse::<f64>().map_err(|e| {
        ExporterError::Parse(credentials.redact(&format!("parsing {:?}: {}", text, e)))
    })
}
