//! Publisher Phase Metrics
//!
//! Descriptor management and data point writes against the monitoring backend.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct PublisherMetrics;

impl PublisherMetrics {
    pub fn record_descriptor_found() {
        ::metrics::counter!(phase_metric!(counter, "publisher", "descriptor_found")).increment(1);
    }

    pub fn record_descriptor_created() {
        ::metrics::counter!(phase_metric!(counter, "publisher", "descriptor_created")).increment(1);
    }

    pub fn record_descriptor_error() {
        ::metrics::counter!(phase_metric!(counter, "publisher", "descriptor_errors")).increment(1);
    }

    pub fn record_write_success(duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "publisher", "writes_success")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "publisher", "write_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_write_error() {
        ::metrics::counter!(phase_metric!(counter, "publisher", "writes_error")).increment(1);
    }
}

impl PhaseMetrics for PublisherMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "publisher", "descriptor_found"));
        let _ = counter!(phase_metric!(counter, "publisher", "descriptor_created"));
        let _ = counter!(phase_metric!(counter, "publisher", "descriptor_errors"));
        let _ = counter!(phase_metric!(counter, "publisher", "writes_success"));
        let _ = counter!(phase_metric!(counter, "publisher", "writes_error"));
        let _ = histogram!(phase_metric!(histogram, "publisher", "write_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "publisher"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "publisher", "descriptor_found"),
                metric_type: MetricType::Counter,
                help: "Runs that found the wait-time descriptor already registered",
            },
            MetricDoc {
                name: phase_metric!(counter, "publisher", "descriptor_created"),
                metric_type: MetricType::Counter,
                help: "Wait-time descriptors created",
            },
            MetricDoc {
                name: phase_metric!(counter, "publisher", "descriptor_errors"),
                metric_type: MetricType::Counter,
                help: "Descriptor lookups or creations that failed",
            },
            MetricDoc {
                name: phase_metric!(counter, "publisher", "writes_success"),
                metric_type: MetricType::Counter,
                help: "Data points accepted by the backend",
            },
            MetricDoc {
                name: phase_metric!(counter, "publisher", "writes_error"),
                metric_type: MetricType::Counter,
                help: "Data points rejected or not delivered",
            },
            MetricDoc {
                name: phase_metric!(histogram, "publisher", "write_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Latency of a single time series write",
            },
        ]
    }
}
