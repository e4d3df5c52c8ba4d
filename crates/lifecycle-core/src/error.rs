use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("incomplete event: {0}")]
    IncompleteEvent(String),

    #[error("action contributor '{contributor}' failed: {reason}")]
    ContributorFailed { contributor: String, reason: String },

    #[error("action contributor '{contributor}' timed out after {timeout_ms}ms")]
    ContributorTimedOut { contributor: String, timeout_ms: u64 },

    #[error("preference '{preference}' for team '{team}' is malformed: {reason}")]
    PreferenceParse {
        team: String,
        preference: String,
        reason: String,
    },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("no renderers registered for {0} lifecycles")]
    UnsupportedLifecycle(String),

    #[error("invalid render target '{0}': must be chat or card")]
    InvalidRenderTarget(String),

    #[error("invalid rendering style '{0}': must be full or compact")]
    InvalidRenderingStyle(String),

    #[error("invalid goal state: {0}")]
    InvalidGoalState(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
