//! Feed Phase Metrics
//!
//! Fetching the wait-time feed and parsing it into a snapshot.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct FeedMetrics;

impl FeedMetrics {
    pub fn record_fetch_success(duration_secs: f64, payload_bytes: usize) {
        ::metrics::counter!(phase_metric!(counter, "feed", "fetches_success")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "feed", "fetch_duration_seconds"))
            .record(duration_secs);
        ::metrics::histogram!(phase_metric!(histogram, "feed", "payload_bytes"))
            .record(payload_bytes as f64);
    }

    pub fn record_fetch_error() {
        ::metrics::counter!(phase_metric!(counter, "feed", "fetches_error")).increment(1);
    }

    pub fn record_parse_success(branches: usize) {
        ::metrics::counter!(phase_metric!(counter, "feed", "branches_parsed"))
            .increment(branches as u64);
    }

    pub fn record_parse_error() {
        ::metrics::counter!(phase_metric!(counter, "feed", "parse_errors")).increment(1);
    }
}

impl PhaseMetrics for FeedMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "feed", "fetches_success"));
        let _ = counter!(phase_metric!(counter, "feed", "fetches_error"));
        let _ = counter!(phase_metric!(counter, "feed", "branches_parsed"));
        let _ = counter!(phase_metric!(counter, "feed", "parse_errors"));
        let _ = histogram!(phase_metric!(histogram, "feed", "fetch_duration_seconds"));
        let _ = histogram!(phase_metric!(histogram, "feed", "payload_bytes"));
    }

    fn phase_name() -> &'static str {
        "feed"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "feed", "fetches_success"),
                metric_type: MetricType::Counter,
                help: "Feed fetches that returned a body",
            },
            MetricDoc {
                name: phase_metric!(counter, "feed", "fetches_error"),
                metric_type: MetricType::Counter,
                help: "Feed fetches that failed or timed out",
            },
            MetricDoc {
                name: phase_metric!(counter, "feed", "branches_parsed"),
                metric_type: MetricType::Counter,
                help: "Branches parsed from the feed",
            },
            MetricDoc {
                name: phase_metric!(counter, "feed", "parse_errors"),
                metric_type: MetricType::Counter,
                help: "Feed documents that could not be parsed",
            },
            MetricDoc {
                name: phase_metric!(histogram, "feed", "fetch_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent fetching the feed",
            },
            MetricDoc {
                name: phase_metric!(histogram, "feed", "payload_bytes"),
                metric_type: MetricType::Histogram,
                help: "Size of the fetched feed document",
            },
        ]
    }
}
