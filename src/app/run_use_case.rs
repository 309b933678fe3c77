use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::app::ports::FeedSourcePort;
use crate::app::publish_use_case::{PublishReport, PublishUseCase};
use crate::error::Result;
use crate::metrics::FeedMetrics;
use crate::parser::parse_snapshot;
use crate::types::{now_rfc3339, Service, WaitTimeSnapshot};

/// Branch/service pair read back after publishing
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub branch: Option<String>,
    pub service: Option<Service>,
}

/// Use case for one complete run: fetch, parse, ensure the descriptor, publish, verify
pub struct RunUseCase {
    feed: Box<dyn FeedSourcePort>,
    publisher: PublishUseCase,
    verification: Option<Verification>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub timestamp: String,
    pub branches: usize,
    pub report: PublishReport,
}

impl RunUseCase {
    pub fn new(
        feed: Box<dyn FeedSourcePort>,
        publisher: PublishUseCase,
        verification: Option<Verification>,
    ) -> Self {
        Self {
            feed,
            publisher,
            verification,
        }
    }

    /// Fetch and parse the feed into a snapshot
    pub async fn load_snapshot(&self) -> Result<WaitTimeSnapshot> {
        let started = Instant::now();
        let body = match self.feed.fetch().await {
            Ok(body) => body,
            Err(e) => {
                FeedMetrics::record_fetch_error();
                return Err(e);
            }
        };
        FeedMetrics::record_fetch_success(started.elapsed().as_secs_f64(), body.len());

        match parse_snapshot(&body) {
            Ok(snapshot) => {
                FeedMetrics::record_parse_success(snapshot.len());
                Ok(snapshot)
            }
            Err(e) => {
                FeedMetrics::record_parse_error();
                Err(e)
            }
        }
    }

    /// Run once for `project_id` with the current time as the point timestamp
    pub async fn run(&self, project_id: &str) -> Result<RunSummary> {
        self.run_at(project_id, &now_rfc3339()).await
    }

    /// Run once, stamping every data point with `timestamp`.
    ///
    /// Fetch, parse and descriptor failures abort before anything is written.
    /// Individual write failures are counted in the summary; the verification
    /// query only logs its failure.
    pub async fn run_at(&self, project_id: &str, timestamp: &str) -> Result<RunSummary> {
        let span = info_span!("run", project = %project_id, time = %timestamp);
        async move {
            info!("Running: time={}", timestamp);

            let snapshot = self.load_snapshot().await?;
            info!("Fetched wait times for {} branches", snapshot.len());

            self.publisher.ensure_descriptor(project_id).await?;

            let report = self
                .publisher
                .publish_snapshot(project_id, &snapshot, timestamp)
                .await?;

            if let Some(verification) = &self.verification {
                if let Err(e) = self
                    .publisher
                    .query_recent(
                        project_id,
                        verification.branch.as_deref(),
                        verification.service,
                    )
                    .await
                {
                    warn!("Verification query failed: {}", e);
                }
            }

            Ok(RunSummary {
                timestamp: timestamp.to_string(),
                branches: snapshot.len(),
                report,
            })
        }
        .instrument(span)
        .await
    }
}
