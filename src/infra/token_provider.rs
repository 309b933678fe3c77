use crate::app::ports::TokenProviderPort;
use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
const GCLOUD_TIMEOUT_SECS: u64 = 10;

/// A token supplied up front, e.g. from the environment
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProviderPort for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Resolves application-default credentials through the gcloud CLI.
///
/// The token is fetched once and reused for the rest of the process; a run
/// lasts far less than the token lifetime.
pub struct GcloudTokenProvider {
    program: String,
    cached: Mutex<Option<String>>,
}

impl Default for GcloudTokenProvider {
    fn default() -> Self {
        Self::new("gcloud")
    }
}

impl GcloudTokenProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["auth", "application-default", "print-access-token"]);

        let output = match timeout(Duration::from_secs(GCLOUD_TIMEOUT_SECS), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(MetricsError::Auth(format!(
                    "failed to execute {}: {}",
                    self.program, e
                )))
            }
            Err(_) => {
                return Err(MetricsError::Auth(format!(
                    "{} timed out after {} seconds",
                    self.program, GCLOUD_TIMEOUT_SECS
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MetricsError::Auth(format!(
                "{} exited with status {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8(output.stdout)
            .map_err(|_| MetricsError::Auth("access token is not valid UTF-8".into()))?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(MetricsError::Auth("gcloud returned an empty access token".into()));
        }
        Ok(token)
    }
}

#[async_trait]
impl TokenProviderPort for GcloudTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        debug!("Resolving application-default credentials via {}", self.program);
        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// Pick the credential source: an explicit token from the environment wins,
/// otherwise application-default credentials via gcloud.
pub fn from_environment() -> Box<dyn TokenProviderPort> {
    match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            Box::new(StaticTokenProvider::new(token.trim()))
        }
        _ => Box::new(GcloudTokenProvider::default()),
    }
}
