use thiserror::Error;
use tokio::task::JoinError;

use drillhund_config::ConfigError;

use crate::provider::ProviderError;
use crate::scenario::ScenarioError;

/// Top-level error for CLI commands and embedding callers. Inside a running
/// session nothing is fatal; these cover startup, scenario tooling, and
/// replay validation.
#[derive(Debug, Error)]
pub enum DrillError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JoinError> for DrillError {
    fn from(err: JoinError) -> Self {
        DrillError::Validation(err.to_string())
    }
}
