//! Caseboard job lifecycle.
//!
//! A [`JobManager`] turns each submitted case into a job, runs the review
//! pipeline for it on a background task, and exposes snapshots through
//! [`JobStorage`].

#![deny(unsafe_code)]

pub mod error;
pub mod manager;
pub mod storage;

pub use error::{JobError, JobResult, StorageError, StorageResult};
pub use manager::{JobManager, JobTicket, JobsConfig};
pub use storage::{InMemoryJobStorage, JobStorage, JobUpdate};
