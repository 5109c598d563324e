//! Caseboard audit trail.
//!
//! One append-only sink is constructed at process start and shared by
//! reference with every component that records lifecycle events. Events
//! are hash-chained so a trail can be checked with [`verify_chain`].

#![deny(unsafe_code)]

pub mod error;
pub mod event;
pub mod sink;

pub use error::{AuditError, AuditResult};
pub use event::{verify_chain, AuditEvent, AuditEventBuilder, PendingAuditEvent};
pub use sink::{AuditSink, FileAuditSink, MemoryAuditSink};
