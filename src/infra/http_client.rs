use crate::app::ports::FeedSourcePort;
use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Fetches the wait-time feed over HTTP with a bounded request time
pub struct ReqwestFeedSource {
    client: reqwest::Client,
    url: String,
}

impl ReqwestFeedSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSourcePort for ReqwestFeedSource {
    async fn fetch(&self) -> Result<String> {
        debug!("Fetching wait-time feed from {}", self.url);
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| MetricsError::Network(format!("feed request to {} failed: {}", self.url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MetricsError::Network(format!(
                "feed {} returned status {}",
                self.url, status
            )));
        }

        resp.text()
            .await
            .map_err(|e| MetricsError::Network(format!("failed to read feed body: {}", e)))
    }
}
