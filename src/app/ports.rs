use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::MetricDescriptor;

/// Source of the raw wait-time feed document
#[async_trait]
pub trait FeedSourcePort: Send + Sync {
    async fn fetch(&self) -> Result<String>;
}

/// The subset of the Cloud Monitoring API this job consumes
#[async_trait]
pub trait MonitoringPort: Send + Sync {
    /// Look up a descriptor by resource name; `Ok(None)` when it does not exist
    async fn get_metric_descriptor(&self, name: &str) -> Result<Option<MetricDescriptor>>;

    async fn create_metric_descriptor(
        &self,
        project_name: &str,
        descriptor: &MetricDescriptor,
    ) -> Result<MetricDescriptor>;

    async fn create_time_series(&self, project_name: &str, body: &Value) -> Result<()>;

    async fn list_time_series(&self, project_name: &str, query: &TimeSeriesQuery) -> Result<Value>;
}

/// Supplies bearer tokens for the monitoring backend
#[async_trait]
pub trait TokenProviderPort: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Parameters of a `timeSeries.list` request
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesQuery {
    pub filter: String,
    pub start_time: String,
    pub end_time: String,
}
