//! The validator contract.

use crate::error::ValidatorResult;
use caseboard_types::{FindingSeverity, NormalizedCase};
use serde::{Deserialize, Serialize};

/// One finding reported by a validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub code: String,
    pub severity: FindingSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
}

impl ValidationFinding {
    pub fn new(code: impl Into<String>, severity: FindingSeverity, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            data_path: None,
        }
    }

    pub fn at(mut self, data_path: impl Into<String>) -> Self {
        self.data_path = Some(data_path.into());
        self
    }
}

/// An independent check over a normalized case.
///
/// `run` is synchronous and may block; the runner executes it on the
/// blocking pool.
pub trait Validator: Send + Sync {
    /// Stable code the validator is ordered and reported by.
    fn code(&self) -> &str;

    fn description(&self) -> &str;

    /// Component reported as the outcome's source.
    fn component(&self) -> &str {
        env!("CARGO_PKG_NAME")
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn run(&self, case: &NormalizedCase) -> ValidatorResult<Vec<ValidationFinding>>;
}
