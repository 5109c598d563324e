//! Storage trait definitions

use crate::error::StorageResult;
use async_trait::async_trait;
use caseboard_types::{
    BoardId, BoardResult, Consensus, Job, JobId, JobState, ProtocolCard, ValidatorOutcome,
};
use std::collections::BTreeMap;

/// A partial update to a job record. Unset fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobUpdate {
    pub state: Option<JobState>,
    pub boards: Option<BTreeMap<BoardId, BoardResult>>,
    pub consensus: Option<Consensus>,
    pub protocol_card: Option<ProtocolCard>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn boards(mut self, boards: BTreeMap<BoardId, BoardResult>) -> Self {
        self.boards = Some(boards);
        self
    }

    pub fn consensus(mut self, consensus: Consensus) -> Self {
        self.consensus = Some(consensus);
        self
    }

    pub fn protocol_card(mut self, card: ProtocolCard) -> Self {
        self.protocol_card = Some(card);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Merge the set fields into `job`.
    pub fn apply(self, job: &mut Job) {
        if let Some(state) = self.state {
            job.state = state;
        }
        if let Some(boards) = self.boards {
            job.boards = Some(boards);
        }
        if let Some(consensus) = self.consensus {
            job.consensus = Some(consensus);
        }
        if let Some(card) = self.protocol_card {
            job.protocol_card = Some(card);
        }
        if let Some(error) = self.error {
            job.error = Some(error);
        }
    }
}

/// Storage for job records
///
/// Implementations apply each call atomically, so readers only ever see
/// whole snapshots.
#[async_trait]
pub trait JobStorage: Send + Sync {
    /// Store a job unless one with the same id exists. Returns whether it was stored.
    async fn create(&self, job: Job) -> StorageResult<bool>;

    /// Merge `update` into a stored job and return the result.
    ///
    /// Fails with `TerminalState` if the job already finished.
    async fn update(&self, id: &JobId, update: JobUpdate) -> StorageResult<Job>;

    /// Get a job by ID
    async fn get(&self, id: &JobId) -> StorageResult<Option<Job>>;

    /// Replace the validator outcomes of a job, terminal or not.
    ///
    /// Validators run after a job finishes, so this is the one write a
    /// terminal job accepts. No other field is touched.
    async fn attach_validators(
        &self,
        id: &JobId,
        outcomes: Vec<ValidatorOutcome>,
    ) -> StorageResult<Job>;
}
