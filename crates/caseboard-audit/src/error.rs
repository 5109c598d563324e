//! Error types for the audit trail

use thiserror::Error;

/// Audit errors
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Incomplete audit event: {0} is required")]
    Incomplete(&'static str),
}

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;
