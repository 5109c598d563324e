//! Validator policy: ordering, concurrency and severity overrides.

use crate::validator::Validator;
use caseboard_types::FindingSeverity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How a validator pass is run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorPolicy {
    /// Validator codes to dispatch first, in this order
    pub order: Vec<String>,
    /// Maximum validators executing at once (default: 4)
    pub concurrency: usize,
    /// Finding code -> severity applied after a validator runs
    pub severity_overrides: BTreeMap<String, FindingSeverity>,
}

impl Default for ValidatorPolicy {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            concurrency: 4,
            severity_overrides: BTreeMap::new(),
        }
    }
}

impl ValidatorPolicy {
    /// Concurrency bound, never below one.
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Dispatch order: listed codes first in policy order, then the rest in
    /// discovery order.
    pub fn arrange(&self, validators: &[Arc<dyn Validator>]) -> Vec<Arc<dyn Validator>> {
        let rank = |v: &Arc<dyn Validator>| {
            self.order
                .iter()
                .position(|code| code == v.code())
                .unwrap_or(usize::MAX)
        };
        let mut arranged = validators.to_vec();
        // Stable, so unlisted validators keep discovery order.
        arranged.sort_by_key(rank);
        arranged
    }

    /// Severity after applying overrides.
    ///
    /// Codes match case-insensitively; layered config sources may lowercase
    /// map keys.
    pub fn severity_for(&self, code: &str, severity: FindingSeverity) -> FindingSeverity {
        self.severity_overrides
            .get(code)
            .or_else(|| {
                self.severity_overrides
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(code))
                    .map(|(_, v)| v)
            })
            .copied()
            .unwrap_or(severity)
    }
}
