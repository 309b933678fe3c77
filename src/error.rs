use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MetricsError {
    /// Process exit code reported for a run that ended with this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MetricsError::Network(_) | MetricsError::Http(_) | MetricsError::Parse(_) => 1,
            MetricsError::Auth(_) => 2,
            _ => 3,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, MetricsError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
