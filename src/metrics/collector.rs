use anyhow::Result;
use prometheus::core::Collector;
use prometheus::{GaugeVec, Opts, Registry};

const BALANCE_SUBSYSTEM: &str = "balance";
const BALANCE_NAME: &str = "stream_telecom";
const BALANCE_HELP: &str = "Balance in Stream Telecom account";
const SERVICE_LABEL: &str = "service";

/// Metrics registry of the exporter.
///
/// Holds the `balance_stream_telecom` gauge, labelled by account login, and on
/// Linux the standard process metrics. The gauge cells are atomic, so the
/// updater can write while request handlers gather.
pub struct BalanceMetrics {
    registry: Registry,
    balance: GaugeVec,
}

impl BalanceMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let balance = GaugeVec::new(
            Opts::new(BALANCE_NAME, BALANCE_HELP).subsystem(BALANCE_SUBSYSTEM),
            &[SERVICE_LABEL],
        )?;
        registry.register(Box::new(balance.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self { registry, balance })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Publish `value` as the current balance of `service`.
    pub fn set_balance(&self, service: &str, value: f64) {
        self.balance.with_label_values(&[service]).set(value);
    }

    /// Last published balance of `service`, if one was ever published.
    pub fn balance(&self, service: &str) -> Option<f64> {
        self.balance
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == SERVICE_LABEL && label.get_value() == service)
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of label sets currently exported for the balance gauge.
    pub fn series_count(&self) -> usize {
        self.balance
            .collect()
            .iter()
            .map(|family| family.get_metric().len())
            .sum()
    }

    /// Render every registered metric in the text exposition format.
    pub fn render(&self) -> Result<String> {
        super::export_metrics(&self.registry)
    }
}
