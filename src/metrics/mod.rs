//! Run metrics for the wait-time publisher
//!
//! Each phase of a run (feed fetch/parse, publishing) defines its own metrics in
//! a dedicated submodule. The job is short-lived, so instead of exposing an HTTP
//! endpoint the Prometheus recorder is rendered in-process at the end of a run.

pub mod feed;
pub mod publisher;
pub mod registry;

pub use feed::FeedMetrics;
pub use publisher::PublisherMetrics;

use std::sync::{Once, OnceLock};
use tracing::{debug, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and register all phase metrics.
///
/// Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("metrics: recorder handle was already stored");
                }
                registry::register_all_metrics();
                debug!("metrics: Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Render the current metric values in Prometheus text format
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Register all metrics for this phase so they appear before first use
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Build a metric name following `rmv_{phase}_{metric_name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("rmv_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("rmv_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_naming_convention() {
        assert_eq!(
            phase_metric!(counter, "publisher", "writes_success"),
            "rmv_publisher_writes_success_total"
        );
        assert_eq!(
            phase_metric!(histogram, "feed", "fetch_duration_seconds"),
            "rmv_feed_fetch_duration_seconds"
        );
    }
}
