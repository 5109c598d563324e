//! Jobs: one case tracked through the pipeline.

use crate::board::{BoardId, BoardResult};
use crate::case::Case;
use crate::consensus::Consensus;
use crate::protocol::ProtocolCard;
use crate::validation::ValidatorOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Job Identifier ───────────────────────────────────────────────────

/// Unique identifier for a job
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Job State ────────────────────────────────────────────────────────

/// Lifecycle state of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Done,
    Error,
    /// Reserved for validator-gated flows; never produced by the current pipeline.
    Blocked,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Error | JobState::Blocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Done => "done",
            JobState::Error => "error",
            JobState::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Job Record ───────────────────────────────────────────────────────

/// A job record as persisted and as returned to readers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    /// Reference to the audit trail the job's events are appended to.
    pub audit_ref: Option<String>,
    /// The original submission, stored verbatim.
    pub input: Case,
    #[serde(default)]
    pub boards: Option<BTreeMap<BoardId, BoardResult>>,
    #[serde(default)]
    pub consensus: Option<Consensus>,
    #[serde(default)]
    pub protocol_card: Option<ProtocolCard>,
    #[serde(default)]
    pub validators: Vec<ValidatorOutcome>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Job {
    /// A freshly queued job.
    pub fn queued(id: JobId, input: Case, audit_ref: Option<String>) -> Self {
        Self {
            id,
            state: JobState::Queued,
            created_at: Utc::now(),
            audit_ref,
            input,
            boards: None,
            consensus: None,
            protocol_card: None,
            validators: Vec::new(),
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocked_counts_as_terminal() {
        assert!(!JobState::Queued.is_terminal());
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Error.is_terminal());
        assert!(JobState::Blocked.is_terminal());
    }

    #[test]
    fn queued_job_round_trips_through_json() {
        let job = Job::queued(
            JobId::generate(),
            Case::new(json!({"clinical_notes": "memory decline"})),
            Some("memory".into()),
        );
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
        assert_eq!(serde_json::to_value(&job).unwrap()["state"], json!("queued"));
    }
}
