//! Default values for configuration options

use std::time::Duration;

/// Billing API endpoint answering balance inquiries.
pub const DEFAULT_API_URL: &str = "https://gateway.api.sc/get/";

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9602";

pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 10;

pub const DEFAULT_RETRY_LIMIT: u32 = 10;

pub const DEFAULT_INDEX_FILE: &str = "static/index.html";

// Billing API request
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

// Metrics HTTP endpoint
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
