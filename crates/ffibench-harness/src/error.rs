//! Harness error type.

use thiserror::Error;

use ffibench_bridge::BridgeError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bridge: {0}")]
    Bridge(#[from] BridgeError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("property `{property}` violated: {detail}")]
    PropertyViolation { property: String, detail: String },
}

impl HarnessError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidArgument(detail.into())
    }
}
