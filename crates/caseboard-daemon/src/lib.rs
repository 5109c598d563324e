//! Caseboard daemon library
//!
//! Wires the review pipeline, validator runner, audit sink and job manager
//! from a layered [`CaseboardConfig`], and sets up tracing for the
//! `caseboard` binary.

#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod error;
pub mod telemetry;

pub use app::{Caseboard, CaseboardBuilder};
pub use config::{AuditConfig, AuditSinkKind, CaseboardConfig, LoggingConfig};
pub use error::{DaemonError, DaemonResult};
pub use telemetry::init_tracing;
