use crate::balance::HttpBalanceSource;
use crate::config::defaults::*;
use crate::config::{Credentials, ExporterConfig};
use crate::logging::LogFormat;
use crate::metrics::BalanceMetrics;
use crate::server::{MetricsServer, ShutdownCoordinator};
use crate::updater::BalanceUpdater;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// The address to listen on for HTTP requests
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,

    /// Interval (in seconds) for request balance
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u64,

    /// Interval (in seconds) for load balance when errors
    #[arg(long, default_value_t = DEFAULT_RETRY_INTERVAL_SECS)]
    pub retry_interval: u64,

    /// Count of tries when error
    #[arg(long, default_value_t = DEFAULT_RETRY_LIMIT)]
    pub retry_limit: u32,

    /// Balance inquiry endpoint of the billing API
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Page served at /
    #[arg(long, default_value = DEFAULT_INDEX_FILE)]
    pub index_file: PathBuf,

    /// Log level or filter directive (RUST_LOG overrides)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServeArgs {
    pub fn to_config(&self) -> ExporterConfig {
        ExporterConfig {
            listen_address: self.listen_address.clone(),
            api_url: self.api_url.clone(),
            index_file: self.index_file.clone(),
            interval: Duration::from_secs(self.interval),
            retry_interval: Duration::from_secs(self.retry_interval),
            retry_limit: self.retry_limit,
        }
    }
}

pub async fn run(args: ServeArgs) -> Result<()> {
    crate::logging::init_logging(&args.log_level, args.log_format)?;

    info!("Starting Stream Telecom balance exporter v{}", crate::VERSION);

    let config = args.to_config();
    for warning in config.validate()? {
        warn!("{}", warning);
    }

    let credentials = Arc::new(Credentials::from_env().context("Configuration error")?);

    let metrics = Arc::new(BalanceMetrics::new().context("Failed to register metrics")?);
    let source = Arc::new(HttpBalanceSource::new(
        config.api_url.clone(),
        Arc::clone(&credentials),
    )?);
    let updater = BalanceUpdater::new(
        source,
        Arc::clone(&metrics),
        Arc::clone(&credentials),
        config.retry_policy(),
    );

    // The exporter never starts without a known balance.
    let balance = updater
        .update_once()
        .await
        .context("Initial balance load failed")?;
    info!("Initial balance loaded: {}", balance);

    let shutdown_coordinator = Arc::new(ShutdownCoordinator::new(SHUTDOWN_TIMEOUT));
    tokio::spawn(updater.run(shutdown_coordinator.subscribe()));
    info!(
        "Exporter will update balance every {} seconds",
        config.interval.as_secs()
    );

    MetricsServer::new(metrics, config.index_file.clone(), shutdown_coordinator)
        .serve(&config.listen_address)
        .await
}
