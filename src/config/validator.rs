use super::ExporterConfig;
use anyhow::{bail, Result};

pub fn validate_config(config: &ExporterConfig) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if config.interval.is_zero() {
        bail!("Update interval must be greater than 0 seconds");
    }

    if config.retry_interval.is_zero() {
        bail!("Retry interval must be greater than 0 seconds");
    }

    if config.retry_interval > config.interval {
        warnings.push(format!(
            "[!] Retry interval ({}s) is longer than the update interval ({}s). Failed requests will be retried slower than regular updates.",
            config.retry_interval.as_secs(),
            config.interval.as_secs()
        ));
    }

    if config.retry_limit == 0 {
        warnings.push("[i] Retry limit is 0. Failed requests will not be retried before the next regular update.".to_string());
    }

    if !config.index_file.is_file() {
        warnings.push(format!(
            "[i] Index file not found at: {}. Requests to / will return 404",
            config.index_file.display()
        ));
    }

    Ok(warnings)
}
