use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use crate::app::ports::{MonitoringPort, TimeSeriesQuery};
use crate::constants::{
    descriptor_name, project_name, BRANCH_LABEL, DESCRIPTOR_DESCRIPTION, DESCRIPTOR_DISPLAY_NAME,
    DESCRIPTOR_UNIT, GLOBAL_RESOURCE_TYPE, QUERY_WINDOW_SECS, SERVICE_LABEL, WAIT_TIME_METRIC_TYPE,
};
use crate::error::Result;
use crate::metrics::PublisherMetrics;
use crate::types::{to_rfc3339, DataPoint, LabelDescriptor, MetricDescriptor, Service, WaitTimeSnapshot};

/// Use case for registering the wait-time metric and publishing data points to it
pub struct PublishUseCase {
    monitoring: Box<dyn MonitoringPort>,
    propagation_delay: Duration,
}

impl PublishUseCase {
    pub fn new(monitoring: Box<dyn MonitoringPort>, propagation_delay: Duration) -> Self {
        Self {
            monitoring,
            propagation_delay,
        }
    }

    /// Return the wait-time descriptor, creating it when it is not registered yet.
    ///
    /// A failed lookup is treated as "does not exist". After a create, waits for the
    /// propagation delay before returning so that the first writes see the new type.
    #[instrument(skip(self))]
    pub async fn ensure_descriptor(&self, project_id: &str) -> Result<MetricDescriptor> {
        match self.monitoring.get_metric_descriptor(&descriptor_name(project_id)).await {
            Ok(Some(descriptor)) => {
                PublisherMetrics::record_descriptor_found();
                return Ok(descriptor);
            }
            Ok(None) => {
                info!("Metric descriptor {} not registered", WAIT_TIME_METRIC_TYPE);
            }
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                PublisherMetrics::record_descriptor_error();
                warn!("Failed to get metric descriptor: {}", e);
            }
        }

        info!("Creating custom metric descriptor for MA RMV wait time.");
        let created = match self
            .monitoring
            .create_metric_descriptor(&project_name(project_id), &wait_time_descriptor())
            .await
        {
            Ok(descriptor) => descriptor,
            Err(e) => {
                PublisherMetrics::record_descriptor_error();
                error!("Failed to create metric descriptor: {}", e);
                return Err(e);
            }
        };
        PublisherMetrics::record_descriptor_created();

        if !self.propagation_delay.is_zero() {
            info!(
                "Waiting {}s for the new descriptor to propagate",
                self.propagation_delay.as_secs_f64()
            );
            tokio::time::sleep(self.propagation_delay).await;
        }
        Ok(created)
    }

    /// Write a single data point. Failures are logged here and returned to the caller.
    #[instrument(skip(self, point), fields(branch = %point.branch, service = %point.service))]
    pub async fn write_point(&self, project_id: &str, point: &DataPoint) -> Result<()> {
        let body = build_time_series_body(project_id, point);
        let started = Instant::now();

        match self
            .monitoring
            .create_time_series(&project_name(project_id), &body)
            .await
        {
            Ok(()) => {
                PublisherMetrics::record_write_success(started.elapsed().as_secs_f64());
                Ok(())
            }
            Err(e) => {
                PublisherMetrics::record_write_error();
                warn!(
                    "Write failed: branch={}, service={}, error={}",
                    point.branch, point.service, e
                );
                Err(e)
            }
        }
    }

    /// Write every (branch, service) pair of the snapshot.
    ///
    /// A failed write never stops the remaining ones; only an authentication
    /// failure aborts, since every later write would fail the same way.
    pub async fn publish_snapshot(
        &self,
        project_id: &str,
        snapshot: &WaitTimeSnapshot,
        timestamp: &str,
    ) -> Result<PublishReport> {
        let mut report = PublishReport::default();

        for (branch, record) in snapshot {
            for service in Service::ALL {
                let Some(value) = record.minutes(service) else {
                    warn!("Branch {} reported no {} wait time; skipping", branch, service);
                    report.skipped += 1;
                    continue;
                };

                let point = DataPoint {
                    branch: branch.clone(),
                    service,
                    timestamp: timestamp.to_string(),
                    value,
                };

                match self.write_point(project_id, &point).await {
                    Ok(()) => report.written += 1,
                    Err(e) if e.is_auth() => return Err(e),
                    Err(_) => {
                        report.failed += 1;
                        report.failures.push((branch.clone(), service));
                    }
                }
            }
        }

        info!(
            "Published snapshot: written={}, failed={}, skipped={}",
            report.written, report.failed, report.skipped
        );
        Ok(report)
    }

    /// Read back the trailing hour of points, optionally narrowed by branch and service.
    ///
    /// The response is only logged; it is returned for callers that want to inspect it.
    pub async fn query_recent(
        &self,
        project_id: &str,
        branch: Option<&str>,
        service: Option<Service>,
    ) -> Result<Value> {
        let query = build_query(branch, service, Utc::now());
        let response = self
            .monitoring
            .list_time_series(&project_name(project_id), &query)
            .await?;
        info!("Query result: {}", response);
        Ok(response)
    }
}

/// Outcome of publishing one snapshot
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishReport {
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<(String, Service)>,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.written + self.failed
    }
}

/// Fixed schema of the wait-time custom metric
pub fn wait_time_descriptor() -> MetricDescriptor {
    MetricDescriptor {
        name: None,
        metric_type: WAIT_TIME_METRIC_TYPE.to_string(),
        labels: vec![
            LabelDescriptor {
                key: BRANCH_LABEL.to_string(),
                value_type: Some("STRING".to_string()),
                description: Some("The RMV branch providing service.".to_string()),
            },
            LabelDescriptor {
                key: SERVICE_LABEL.to_string(),
                value_type: Some("STRING".to_string()),
                description: Some("The type of RMV service.".to_string()),
            },
        ],
        metric_kind: Some("GAUGE".to_string()),
        value_type: Some("DOUBLE".to_string()),
        unit: Some(DESCRIPTOR_UNIT.to_string()),
        display_name: Some(DESCRIPTOR_DISPLAY_NAME.to_string()),
        description: Some(DESCRIPTOR_DESCRIPTION.to_string()),
    }
}

/// Request body of a single-point `timeSeries.create` call
pub fn build_time_series_body(project_id: &str, point: &DataPoint) -> Value {
    json!({
        "timeSeries": [{
            "metric": {
                "type": WAIT_TIME_METRIC_TYPE,
                "labels": {
                    BRANCH_LABEL: point.branch,
                    SERVICE_LABEL: point.service.as_str(),
                },
            },
            "resource": {
                "type": GLOBAL_RESOURCE_TYPE,
                "labels": {
                    "project_id": project_id,
                },
            },
            "points": [{
                "interval": {
                    "endTime": point.timestamp,
                },
                "value": {
                    "doubleValue": point.value,
                },
            }],
        }]
    })
}

/// Monitoring filter selecting the wait-time metric, optionally by branch and service
pub fn build_query_filter(branch: Option<&str>, service: Option<Service>) -> String {
    let mut filter = format!(
        "resource.type=\"{}\" AND metric.type=\"{}\"",
        GLOBAL_RESOURCE_TYPE, WAIT_TIME_METRIC_TYPE
    );
    if let Some(branch) = branch {
        filter.push_str(&format!(
            " AND metric.label.{}=\"{}\"",
            BRANCH_LABEL,
            escape_filter_value(branch)
        ));
    }
    if let Some(service) = service {
        filter.push_str(&format!(
            " AND metric.label.{}=\"{}\"",
            SERVICE_LABEL,
            service.as_str()
        ));
    }
    filter
}

/// Query over the trailing window ending at `now`
pub fn build_query(branch: Option<&str>, service: Option<Service>, now: DateTime<Utc>) -> TimeSeriesQuery {
    let start = now - ChronoDuration::seconds(QUERY_WINDOW_SECS);
    TimeSeriesQuery {
        filter: build_query_filter(branch, service),
        start_time: to_rfc3339(start),
        end_time: to_rfc3339(now),
    }
}

fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use crate::types::{AttributeValue, BranchRecord};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MonitoringCalls {
        gets: usize,
        creates: usize,
        writes: Vec<(String, String, f64)>,
        queries: Vec<TimeSeriesQuery>,
    }

    /// In-memory stand-in for the monitoring backend
    struct MockMonitoring {
        calls: Arc<Mutex<MonitoringCalls>>,
        registered: Arc<Mutex<Option<MetricDescriptor>>>,
        fail_get: bool,
        auth_failure_on_get: bool,
        fail_create: bool,
        fail_write: Option<(String, String)>,
        auth_failure_on_write: bool,
    }

    impl MockMonitoring {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(MonitoringCalls::default())),
                registered: Arc::new(Mutex::new(None)),
                fail_get: false,
                auth_failure_on_get: false,
                fail_create: false,
                fail_write: None,
                auth_failure_on_write: false,
            }
        }
    }

    #[async_trait]
    impl MonitoringPort for MockMonitoring {
        async fn get_metric_descriptor(&self, _name: &str) -> Result<Option<MetricDescriptor>> {
            self.calls.lock().await.gets += 1;
            if self.auth_failure_on_get {
                return Err(MetricsError::Auth("401 Unauthorized".into()));
            }
            if self.fail_get {
                return Err(MetricsError::Network("connection reset".into()));
            }
            Ok(self.registered.lock().await.clone())
        }

        async fn create_metric_descriptor(
            &self,
            _project_name: &str,
            descriptor: &MetricDescriptor,
        ) -> Result<MetricDescriptor> {
            self.calls.lock().await.creates += 1;
            if self.fail_create {
                return Err(MetricsError::Api { status: 403, message: "quota".into() });
            }
            *self.registered.lock().await = Some(descriptor.clone());
            Ok(descriptor.clone())
        }

        async fn create_time_series(&self, _project_name: &str, body: &Value) -> Result<()> {
            let series = &body["timeSeries"][0];
            let branch = series["metric"]["labels"]["branch"].as_str().unwrap_or_default().to_string();
            let service = series["metric"]["labels"]["service"].as_str().unwrap_or_default().to_string();
            let value = series["points"][0]["value"]["doubleValue"].as_f64().unwrap_or(-1.0);
            self.calls.lock().await.writes.push((branch.clone(), service.clone(), value));

            if self.auth_failure_on_write {
                return Err(MetricsError::Auth("token expired".into()));
            }
            if self.fail_write.as_ref() == Some(&(branch, service)) {
                return Err(MetricsError::Api { status: 500, message: "backend error".into() });
            }
            Ok(())
        }

        async fn list_time_series(&self, _project_name: &str, query: &TimeSeriesQuery) -> Result<Value> {
            self.calls.lock().await.queries.push(query.clone());
            Ok(json!({ "timeSeries": [] }))
        }
    }

    fn branch(town: &str, licensing: Option<f64>, registration: Option<f64>) -> BranchRecord {
        let mut record = BranchRecord::new();
        record.insert("town", AttributeValue::Raw(town.to_string()));
        if let Some(m) = licensing {
            record.insert("licensing", AttributeValue::Minutes(m));
        }
        if let Some(m) = registration {
            record.insert("registration", AttributeValue::Minutes(m));
        }
        record
    }

    fn snapshot(records: Vec<BranchRecord>) -> WaitTimeSnapshot {
        records
            .into_iter()
            .map(|r| (r.town().unwrap_or_default().to_string(), r))
            .collect()
    }

    #[tokio::test]
    async fn test_ensure_descriptor_is_idempotent() {
        let monitoring = MockMonitoring::new();
        let calls = monitoring.calls.clone();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        let first = use_case.ensure_descriptor("demo").await.unwrap();
        let second = use_case.ensure_descriptor("demo").await.unwrap();

        assert_eq!(first, second);
        let calls = calls.lock().await;
        assert_eq!(calls.gets, 2);
        assert_eq!(calls.creates, 1);
    }

    #[tokio::test]
    async fn test_ensure_descriptor_creates_after_failed_lookup() {
        let mut monitoring = MockMonitoring::new();
        monitoring.fail_get = true;
        let calls = monitoring.calls.clone();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        let descriptor = use_case.ensure_descriptor("demo").await.unwrap();
        assert_eq!(descriptor.metric_type, WAIT_TIME_METRIC_TYPE);
        assert_eq!(calls.lock().await.creates, 1);
    }

    #[tokio::test]
    async fn test_ensure_descriptor_auth_failure_skips_create() {
        let mut monitoring = MockMonitoring::new();
        monitoring.auth_failure_on_get = true;
        let calls = monitoring.calls.clone();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        let result = use_case.ensure_descriptor("demo").await;
        assert!(matches!(result, Err(MetricsError::Auth(_))));

        let calls = calls.lock().await;
        assert_eq!(calls.gets, 1);
        assert_eq!(calls.creates, 0);
    }

    #[tokio::test]
    async fn test_ensure_descriptor_surfaces_create_failure() {
        let mut monitoring = MockMonitoring::new();
        monitoring.fail_create = true;
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        let result = use_case.ensure_descriptor("demo").await;
        assert!(matches!(result, Err(MetricsError::Api { status: 403, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_descriptor_waits_after_create() {
        let monitoring = MockMonitoring::new();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        use_case.ensure_descriptor("demo").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_publish_continues_after_failed_write() {
        let mut monitoring = MockMonitoring::new();
        monitoring.fail_write = Some(("Boston".into(), "licensing".into()));
        let calls = monitoring.calls.clone();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        let snap = snapshot(vec![
            branch("Boston", Some(15.0), Some(3.0)),
            branch("Worcester", Some(1.0), Some(2.0)),
        ]);
        let report = use_case
            .publish_snapshot("demo", &snap, "2024-03-01T12:00:00Z")
            .await
            .unwrap();

        assert_eq!(calls.lock().await.writes.len(), 4);
        assert_eq!(report.written, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures, vec![("Boston".to_string(), Service::Licensing)]);
    }

    #[tokio::test]
    async fn test_publish_stops_on_auth_failure() {
        let mut monitoring = MockMonitoring::new();
        monitoring.auth_failure_on_write = true;
        let calls = monitoring.calls.clone();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        let snap = snapshot(vec![
            branch("Boston", Some(15.0), Some(3.0)),
            branch("Worcester", Some(1.0), Some(2.0)),
        ]);
        let result = use_case.publish_snapshot("demo", &snap, "2024-03-01T12:00:00Z").await;

        assert!(matches!(result, Err(MetricsError::Auth(_))));
        assert_eq!(calls.lock().await.writes.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_skips_missing_service() {
        let monitoring = MockMonitoring::new();
        let calls = monitoring.calls.clone();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        let snap = snapshot(vec![branch("Boston", Some(15.0), None)]);
        let report = use_case.publish_snapshot("demo", &snap, "2024-03-01T12:00:00Z").await.unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            calls.lock().await.writes,
            vec![("Boston".to_string(), "licensing".to_string(), 15.0)]
        );
    }

    #[tokio::test]
    async fn test_query_recent_uses_trailing_hour() {
        let monitoring = MockMonitoring::new();
        let calls = monitoring.calls.clone();
        let use_case = PublishUseCase::new(Box::new(monitoring), Duration::ZERO);

        use_case
            .query_recent("demo", Some("Boston"), Some(Service::Registration))
            .await
            .unwrap();

        let calls = calls.lock().await;
        let query = &calls.queries[0];
        let start = DateTime::parse_from_rfc3339(&query.start_time).unwrap();
        let end = DateTime::parse_from_rfc3339(&query.end_time).unwrap();
        assert_eq!((end - start).num_seconds(), 3600);
        assert!(query.filter.contains("metric.label.service=\"registration\""));
    }

    #[test]
    fn test_query_filter_branch_only() {
        let filter = build_query_filter(Some("Boston"), None);
        assert!(filter.contains(
            "resource.type=\"global\" AND metric.type=\"custom.googleapis.com/ma_rmv_wait_time\""
        ));
        assert!(filter.contains("metric.label.branch=\"Boston\""));
        assert!(!filter.contains("metric.label.service"));
    }

    #[test]
    fn test_query_filter_without_labels() {
        assert_eq!(
            build_query_filter(None, None),
            "resource.type=\"global\" AND metric.type=\"custom.googleapis.com/ma_rmv_wait_time\""
        );
    }

    #[test]
    fn test_query_filter_escapes_quotes() {
        let filter = build_query_filter(Some("Odd \"Town\""), None);
        assert!(filter.ends_with("metric.label.branch=\"Odd \\\"Town\\\"\""));
    }

    #[test]
    fn test_build_query_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let query = build_query(None, Some(Service::Licensing), now);
        assert_eq!(query.start_time, "2024-03-01T11:00:00Z");
        assert_eq!(query.end_time, "2024-03-01T12:00:00Z");
    }

    #[test]
    fn test_time_series_body_shape() {
        let point = DataPoint {
            branch: "Boston".into(),
            service: Service::Licensing,
            timestamp: "2024-03-01T12:00:00Z".into(),
            value: 15.0,
        };
        let body = build_time_series_body("demo", &point);
        let series = &body["timeSeries"][0];

        assert_eq!(series["metric"]["type"], WAIT_TIME_METRIC_TYPE);
        assert_eq!(series["metric"]["labels"]["branch"], "Boston");
        assert_eq!(series["metric"]["labels"]["service"], "licensing");
        assert_eq!(series["resource"]["type"], "global");
        assert_eq!(series["resource"]["labels"]["project_id"], "demo");
        assert_eq!(series["points"][0]["interval"]["endTime"], "2024-03-01T12:00:00Z");
        assert_eq!(series["points"][0]["value"]["doubleValue"], 15.0);
    }

    #[test]
    fn test_descriptor_schema() {
        let descriptor = wait_time_descriptor();
        let keys: Vec<&str> = descriptor.labels.iter().map(|l| l.key.as_str()).collect();
        assert_eq!(keys, vec!["branch", "service"]);
        assert_eq!(descriptor.metric_kind.as_deref(), Some("GAUGE"));
        assert_eq!(descriptor.value_type.as_deref(), Some("DOUBLE"));
        assert_eq!(descriptor.unit.as_deref(), Some("min"));
    }
}
