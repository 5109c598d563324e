//! Error types for job management

use caseboard_audit::AuditError;
use caseboard_review::ReviewError;
use caseboard_types::{JobId, JobState};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job {id} is already {state}; terminal jobs are immutable")]
    TerminalState { id: JobId, state: JobState },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Job manager errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("timed out after {waited_ms}ms waiting for job {id}")]
    Timeout { id: JobId, waited_ms: u64 },

    #[error("job {0} finished without reporting completion")]
    Abandoned(JobId),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("review error: {0}")]
    Review(#[from] ReviewError),
}

pub type JobResult<T> = Result<T, JobError>;
