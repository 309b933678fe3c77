use crate::app::ports::{MonitoringPort, TimeSeriesQuery, TokenProviderPort};
use crate::error::{MetricsError, Result};
use crate::types::MetricDescriptor;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Cloud Monitoring v3 REST client
pub struct ReqwestMonitoring {
    client: reqwest::Client,
    base_url: String,
    tokens: Box<dyn TokenProviderPort>,
}

impl ReqwestMonitoring {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        tokens: Box<dyn TokenProviderPort>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| MetricsError::Network(e.to_string()))
    }
}

/// Map non-success statuses onto the error taxonomy
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(MetricsError::Auth(format!("backend rejected credentials: {}", body)));
    }
    Err(MetricsError::Api {
        status: status.as_u16(),
        message: body,
    })
}

#[async_trait]
impl MonitoringPort for ReqwestMonitoring {
    async fn get_metric_descriptor(&self, name: &str) -> Result<Option<MetricDescriptor>> {
        let resp = self.send(self.client.get(self.url(name))).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!("Descriptor {} does not exist", name);
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        Ok(Some(resp.json().await?))
    }

    async fn create_metric_descriptor(
        &self,
        project_name: &str,
        descriptor: &MetricDescriptor,
    ) -> Result<MetricDescriptor> {
        let url = self.url(&format!("{}/metricDescriptors", project_name));
        let resp = self.send(self.client.post(url).json(descriptor)).await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn create_time_series(&self, project_name: &str, body: &Value) -> Result<()> {
        let url = self.url(&format!("{}/timeSeries", project_name));
        let resp = self.send(self.client.post(url).json(body)).await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn list_time_series(&self, project_name: &str, query: &TimeSeriesQuery) -> Result<Value> {
        let url = self.url(&format!("{}/timeSeries", project_name));
        let request = self.client.get(url).query(&[
            ("filter", query.filter.as_str()),
            ("interval.startTime", query.start_time.as_str()),
            ("interval.endTime", query.end_time.as_str()),
        ]);
        let resp = check_status(self.send(request).await?).await?;
        Ok(resp.json().await?)
    }
}
