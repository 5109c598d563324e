//! Validator outcomes and reports.

use crate::job::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decision of one validator, ranked `allow < warn < drop < block`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Warn,
    Drop,
    Block,
}

impl Decision {
    pub fn rank(&self) -> u8 {
        match self {
            Decision::Allow => 0,
            Decision::Warn => 1,
            Decision::Drop => 2,
            Decision::Block => 3,
        }
    }

    /// The highest-ranked decision among `decisions`; `allow` when empty.
    pub fn reduce<I>(decisions: I) -> Decision
    where
        I: IntoIterator<Item = Decision>,
    {
        decisions
            .into_iter()
            .max_by_key(Decision::rank)
            .unwrap_or(Decision::Allow)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Allow => "allow",
            Decision::Warn => "warn",
            Decision::Drop => "drop",
            Decision::Block => "block",
        };
        f.write_str(s)
    }
}

/// Severity attached to an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Severity a validator attaches to a single finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Info,
    Warn,
    Drop,
    Block,
}

impl FindingSeverity {
    /// Decision and outcome severity a finding of this severity implies.
    pub fn collapse(&self) -> (Decision, OutcomeSeverity) {
        match self {
            FindingSeverity::Info => (Decision::Allow, OutcomeSeverity::Info),
            FindingSeverity::Warn => (Decision::Warn, OutcomeSeverity::Low),
            FindingSeverity::Drop => (Decision::Drop, OutcomeSeverity::High),
            FindingSeverity::Block => (Decision::Block, OutcomeSeverity::Critical),
        }
    }
}

/// One reason behind an outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl Reason {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data_path: None,
            rule_id: None,
        }
    }

    pub fn with_data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = Some(path.into());
        self
    }
}

/// Attribution of an outcome to the component that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSource {
    pub component: String,
    pub version: String,
}

/// One validator's ranked decision for a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatorOutcome {
    pub validator_name: String,
    pub decision: Decision,
    pub severity: OutcomeSeverity,
    pub reasons: Vec<Reason>,
    pub source: ValidatorSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// All outcomes for one case, reduced to a single decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub case_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<ValidatorOutcome>,
    pub overall: Decision,
    pub engine_version: String,
}

impl ValidationReport {
    /// Overall decision of a set of outcomes.
    pub fn reduce_overall(outcomes: &[ValidatorOutcome]) -> Decision {
        Decision::reduce(outcomes.iter().map(|o| o.decision))
    }

    pub fn outcome(&self, validator_name: &str) -> Option<&ValidatorOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.validator_name == validator_name)
    }
}
