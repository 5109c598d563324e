//! Error types for the caseboard daemon

use caseboard_audit::AuditError;
use caseboard_jobs::JobError;
use caseboard_validators::ValidatorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read {path}: {source}")]
    Input {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("validator setup failed: {0}")]
    Validator(#[from] ValidatorError),

    #[error("job error: {0}")]
    Job(#[from] JobError),

    #[error("tracing initialisation failed: {0}")]
    Tracing(String),
}

pub type DaemonResult<T> = Result<T, DaemonError>;
