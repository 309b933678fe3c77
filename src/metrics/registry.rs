//! Registration of all phase metrics, with early detection of name conflicts.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::feed::FeedMetrics>(&mut all_metrics);
    register_phase_metrics::<super::publisher::PublisherMetrics>(&mut all_metrics);

    debug!("Registered {} run metrics", all_metrics.len());

    if std::env::var("RMV_METRICS_DEBUG").is_ok() {
        for (phase, names) in summarize_by_phase(&all_metrics) {
            debug!("Phase '{}': {} metrics ({})", phase, names.len(), names.join(", "));
        }
    }
}

/// Group registered metric names by the phase encoded in their prefix
fn summarize_by_phase(
    all_metrics: &HashMap<&'static str, MetricDoc>,
) -> BTreeMap<&'static str, Vec<&'static str>> {
    let mut by_phase: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
    for &name in all_metrics.keys() {
        by_phase
            .entry(extract_phase_from_metric_name(name))
            .or_default()
            .push(name);
    }
    for names in by_phase.values_mut() {
        names.sort_unstable();
    }
    by_phase
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if let Some(existing) = all_metrics.get(doc.name) {
            warn!(
                "Metric name conflict: '{}' ({}) redefined by phase '{}'",
                doc.name, existing.help, phase_name
            );
        } else {
            debug!("  - {} ({:?}): {}", doc.name, doc.metric_type, doc.help);
            all_metrics.insert(doc.name, doc);
        }
    }
}

/// Extract phase name from metric name (e.g. "rmv_feed_fetches_success_total" -> "feed")
fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    if let Some(stripped) = metric_name.strip_prefix("rmv_") {
        if let Some(next_underscore) = stripped.find('_') {
            return &stripped[..next_underscore];
        }
    }
    "unknown"
}
