pub mod credentials;
pub mod defaults;
pub mod validator;

pub use credentials::Credentials;

use crate::updater::RetryPolicy;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use defaults::*;

/// Runtime settings of the exporter, everything except the credentials.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub listen_address: String,
    pub api_url: String,
    pub index_file: PathBuf,
    pub interval: Duration,
    pub retry_interval: Duration,
    pub retry_limit: u32,
}

impl ExporterConfig {
    /// Validate the configuration, returning human readable warnings.
    /// Settings that would make the updater spin are rejected outright.
    pub fn validate(&self) -> Result<Vec<String>> {
        validator::validate_config(self)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: self.interval,
            retry_interval: self.retry_interval,
            retry_limit: self.retry_limit,
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            index_file: PathBuf::from(DEFAULT_INDEX_FILE),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_with_index() -> (ExporterConfig, tempfile::NamedTempFile) {
        let mut index = tempfile::NamedTempFile::new().unwrap();
        writeln!(index, "<html></html>").unwrap();
        let config = ExporterConfig {
            index_file: index.path().to_path_buf(),
            ..ExporterConfig::default()
        };
        (config, index)
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::default();
        assert_eq!(config.listen_address, "0.0.0.0:9602");
        assert_eq!(config.interval, Duration::from_secs(3600));
        assert_eq!(config.retry_interval, Duration::from_secs(10));
        assert_eq!(config.retry_limit, 10);

        let policy = config.retry_policy();
        assert_eq!(policy.interval, config.interval);
        assert_eq!(policy.retry_interval, config.retry_interval);
        assert_eq!(policy.retry_limit, 10);
    }

    #[test]
    fn test_valid_config_has_no_warnings() {
        let (config, _index) = config_with_index();
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let (mut config, _index) = config_with_index();
        config.interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let (mut config, _index) = config_with_index();
        config.retry_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warnings() {
        let config = ExporterConfig {
            interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(30),
            retry_limit: 0,
            index_file: PathBuf::from("/nonexistent/index.html"),
            ..ExporterConfig::default()
        };

        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("Retry interval (30s)"));
        assert!(warnings[1].contains("Retry limit is 0"));
        assert!(warnings[2].contains("/nonexistent/index.html"));
    }
}
