//! Caseboard validator pass.
//!
//! Independent validators check a normalized case and report findings. The
//! [`ValidatorRunner`] dispatches them in [`ValidatorPolicy`] order with a
//! bounded number running at once, collapses each validator's findings into
//! one [`ValidatorOutcome`](caseboard_types::ValidatorOutcome), and reduces
//! the outcomes to a single decision. The pass is independent of board
//! review and never gates it.

#![deny(unsafe_code)]

pub mod builtin;
pub mod error;
pub mod policy;
pub mod registry;
pub mod runner;
pub mod validator;

pub use builtin::{AuditCompletenessValidator, PhiValidator, SchemaValidator};
pub use error::{ValidatorError, ValidatorResult};
pub use policy::ValidatorPolicy;
pub use registry::ValidatorRegistry;
pub use runner::{RunPhase, ValidatorRunner, ENGINE_VERSION, EXCEPTION_CODE};
pub use validator::{ValidationFinding, Validator};
