use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use rmv_metrics::app::publish_use_case::PublishUseCase;
use rmv_metrics::app::run_use_case::{RunSummary, RunUseCase, Verification};
use rmv_metrics::config::Config;
use rmv_metrics::error::MetricsError;
use rmv_metrics::infra::http_client::ReqwestFeedSource;
use rmv_metrics::infra::monitoring_client::ReqwestMonitoring;
use rmv_metrics::infra::token_provider;
use rmv_metrics::types::Service;
use rmv_metrics::{logging, metrics};

/// Query the MA RMV for branch wait times and post them as custom metrics.
#[derive(Parser)]
#[command(name = "rmv_metrics")]
#[command(version = "0.1.0")]
struct Cli {
    /// Project ID you want to access
    #[arg(long = "project-id", alias = "project_id")]
    project_id: String,

    /// Optional TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Skip reading back recent points after publishing
    #[arg(long)]
    no_verify: bool,
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    // Credentials are resolved up front so an auth problem fails before the feed is fetched
    let tokens = token_provider::from_environment();
    tokens
        .access_token()
        .await
        .context("resolving application-default credentials")?;

    let monitoring = ReqwestMonitoring::new(&config.monitoring_base_url, config.api_timeout(), tokens)?;
    let publisher = PublishUseCase::new(Box::new(monitoring), config.propagation_delay());
    let feed = ReqwestFeedSource::new(&config.feed_url, config.feed_timeout())?;

    let verification = if cli.no_verify {
        None
    } else {
        Some(Verification {
            branch: config.verify_branch.clone(),
            service: config.verify_service.as_deref().and_then(Service::from_name),
        })
    };

    let use_case = RunUseCase::new(Box::new(feed), publisher, verification);
    Ok(use_case.run(&cli.project_id).await?)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<MetricsError>()
        .map(MetricsError::exit_code)
        .unwrap_or(3)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let guard = logging::init_logging();
    metrics::init_metrics();

    let code = match run(cli).await {
        Ok(summary) => {
            if summary.report.failed > 0 {
                warn!(
                    "{} of {} writes failed",
                    summary.report.failed,
                    summary.report.attempted()
                );
            }
            info!(
                "Run complete: time={}, branches={}, written={}",
                summary.timestamp, summary.branches, summary.report.written
            );
            0
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            exit_code(&e)
        }
    };

    if let Some(rendered) = metrics::render() {
        debug!("Run metrics:\n{}", rendered);
    }

    // Flush the file log before exiting
    drop(guard);
    std::process::exit(code);
}
