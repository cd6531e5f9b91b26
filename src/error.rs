use thiserror::Error;

/// Errors produced by the exporter.
///
/// `Fetch` and `Parse` messages are always passed through
/// [`Credentials::redact`](crate::config::Credentials::redact) before they are
/// constructed, so displaying them never leaks the account secrets.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("environment \"{0}\" is not set")]
    Configuration(&'static str),

    #[error("environment \"{0}\" is not valid UTF-8")]
    ConfigurationEncoding(&'static str),

    #[error("{0}")]
    Fetch(String),

    #[error("Cannot parse balance: {0}")]
    Parse(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

pub type Result<T> = std::result::Result<T, ExporterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_variable() {
        let err = ExporterError::Configuration("STREAM_TELECOM_PASSWORD");
        assert_eq!(
            err.to_string(),
            "environment \"STREAM_TELECOM_PASSWORD\" is not set"
        );
    }

    #[test]
    fn test_parse_and_shutdown_messages() {
        assert_eq!(
            ExporterError::Parse("parsing \"abc\": invalid float literal".into()).to_string(),
            "Cannot parse balance: parsing \"abc\": invalid float literal"
        );
        assert_eq!(
            ExporterError::Shutdown("1 connection(s) still active".into()).to_string(),
            "Shutdown error: 1 connection(s) still active"
        );
    }
}
