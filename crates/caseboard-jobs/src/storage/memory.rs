//! In-memory job storage

use super::traits::{JobStorage, JobUpdate};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use caseboard_types::{Job, JobId, ValidatorOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory job storage for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStorage {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl InMemoryJobStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStorage for InMemoryJobStorage {
    async fn create(&self, job: Job) -> StorageResult<bool> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Ok(false);
        }
        jobs.insert(job.id.clone(), job);
        Ok(true)
    }

    async fn update(&self, id: &JobId, update: JobUpdate) -> StorageResult<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        if job.state.is_terminal() {
            return Err(StorageError::TerminalState {
                id: id.clone(),
                state: job.state,
            });
        }
        update.apply(job);
        Ok(job.clone())
    }

    async fn get(&self, id: &JobId) -> StorageResult<Option<Job>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(id).cloned())
    }

    async fn attach_validators(
        &self,
        id: &JobId,
        outcomes: Vec<ValidatorOutcome>,
    ) -> StorageResult<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        job.validators = outcomes;
        Ok(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseboard_types::{Case, Decision, JobState, OutcomeSeverity, ValidatorSource};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn job(id: &str) -> Job {
        Job::queued(JobId::new(id), Case::new(json!({"notes": "x"})), None)
    }

    #[tokio::test]
    async fn create_is_create_if_absent() {
        let storage = InMemoryJobStorage::new();
        assert!(storage.create(job("j1")).await.unwrap());

        let mut replacement = job("j1");
        replacement.input = Case::empty();
        assert!(!storage.create(replacement).await.unwrap());

        let stored = storage.get(&JobId::new("j1")).await.unwrap().unwrap();
        assert_eq!(stored.input, Case::new(json!({"notes": "x"})));
    }

    #[tokio::test]
    async fn update_merges_only_set_fields() {
        let storage = InMemoryJobStorage::new();
        storage.create(job("j2")).await.unwrap();
        let id = JobId::new("j2");

        storage
            .update(&id, JobUpdate::new().boards(BTreeMap::new()))
            .await
            .unwrap();
        let updated = storage
            .update(&id, JobUpdate::new().error("boom").state(JobState::Error))
            .await
            .unwrap();

        assert_eq!(updated.state, JobState::Error);
        assert_eq!(updated.error.as_deref(), Some("boom"));
        assert_eq!(updated.input, Case::new(json!({"notes": "x"})));
        assert_eq!(updated.boards, Some(BTreeMap::new()));
        assert!(updated.protocol_card.is_none());
    }

    #[tokio::test]
    async fn terminal_jobs_reject_updates() {
        let storage = InMemoryJobStorage::new();
        storage.create(job("j3")).await.unwrap();
        let id = JobId::new("j3");
        storage
            .update(&id, JobUpdate::new().state(JobState::Done))
            .await
            .unwrap();

        let err = storage
            .update(&id, JobUpdate::new().error("late"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::TerminalState {
                state: JobState::Done,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn validators_attach_to_terminal_jobs() {
        let storage = InMemoryJobStorage::new();
        storage.create(job("j4")).await.unwrap();
        let id = JobId::new("j4");
        storage
            .update(&id, JobUpdate::new().state(JobState::Done))
            .await
            .unwrap();

        let outcome = ValidatorOutcome {
            validator_name: "PHI".into(),
            decision: Decision::Allow,
            severity: OutcomeSeverity::Info,
            reasons: Vec::new(),
            source: ValidatorSource {
                component: "test".into(),
                version: "0".into(),
            },
            duration_ms: Some(3),
        };
        let attached = storage
            .attach_validators(&id, vec![outcome.clone()])
            .await
            .unwrap();
        assert_eq!(attached.state, JobState::Done);
        assert_eq!(attached.validators, vec![outcome]);

        let err = storage
            .attach_validators(&JobId::new("nope"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_of_unknown_job_is_not_found() {
        let storage = InMemoryJobStorage::new();
        let err = storage
            .update(&JobId::new("nope"), JobUpdate::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
