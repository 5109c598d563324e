//! Job lifecycle manager
//!
//! Each submission becomes a job record in `queued` state and one background
//! task that runs the review pipeline to completion. The task is the only
//! writer for its job id; it publishes the result with a single storage
//! update so readers never observe a half-finished job.
//!
//! The validator pass runs on its own task once `done` is published. Its
//! outcomes are attached to the finished record afterwards and never move
//! the job's state.

use crate::error::{JobError, JobResult};
use crate::storage::{JobStorage, JobUpdate};
use caseboard_audit::{AuditEvent, AuditSink};
use caseboard_review::{normalize, Review, ReviewPipeline};
use caseboard_types::{Case, Job, JobId, JobState, NormalizedCase, ValidationReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

const AUDIT_ACTOR: &str = "jobs";

/// Job manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Run the validator pass after each job finishes (default: true)
    pub run_validators: bool,

    /// Interval between storage polls in `wait_for` (default: 25)
    pub poll_interval_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            run_validators: true,
            poll_interval_ms: 25,
        }
    }
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Handle returned by [`JobManager::submit`].
///
/// Both waits are cancel-safe and may be repeated; a settled value is kept.
#[derive(Debug)]
pub struct JobTicket {
    pub id: JobId,
    completion: Option<oneshot::Receiver<JobState>>,
    state: Option<JobState>,
    validation: Option<oneshot::Receiver<bool>>,
    validated: Option<bool>,
}

impl JobTicket {
    fn new(
        id: JobId,
        completion: oneshot::Receiver<JobState>,
        validation: oneshot::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            completion: Some(completion),
            state: None,
            validation: Some(validation),
            validated: None,
        }
    }

    /// Wait for the job's background task to report its final state.
    pub async fn completed(&mut self) -> JobResult<JobState> {
        settle(&self.id, &mut self.completion, &mut self.state).await
    }

    /// Wait for the validator pass that follows a finished job.
    ///
    /// `true` once outcomes are attached to the job; `false` when no pass
    /// ran, because validators are disabled or the job did not finish `done`.
    pub async fn validated(&mut self) -> JobResult<bool> {
        settle(&self.id, &mut self.validation, &mut self.validated).await
    }
}

async fn settle<T: Copy>(
    id: &JobId,
    pending: &mut Option<oneshot::Receiver<T>>,
    settled: &mut Option<T>,
) -> JobResult<T> {
    if let Some(value) = *settled {
        return Ok(value);
    }
    let Some(rx) = pending.as_mut() else {
        return Err(JobError::Abandoned(id.clone()));
    };
    let received = rx.await;
    *pending = None;
    let value = received.map_err(|_| JobError::Abandoned(id.clone()))?;
    *settled = Some(value);
    Ok(value)
}

struct ManagerInner {
    storage: Arc<dyn JobStorage>,
    pipeline: Arc<ReviewPipeline>,
    validators: Arc<caseboard_validators::ValidatorRunner>,
    audit: Arc<dyn AuditSink>,
    config: JobsConfig,
}

/// Owns the job state machine: `queued -> done | error`.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<ManagerInner>,
}

impl JobManager {
    pub fn new(
        storage: Arc<dyn JobStorage>,
        pipeline: Arc<ReviewPipeline>,
        validators: Arc<caseboard_validators::ValidatorRunner>,
        audit: Arc<dyn AuditSink>,
        config: JobsConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                storage,
                pipeline,
                validators,
                audit,
                config,
            }),
        }
    }

    pub fn config(&self) -> &JobsConfig {
        &self.inner.config
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.inner.audit
    }

    /// Record a new job and schedule its pipeline. Returns without waiting.
    pub async fn submit(&self, case: Case) -> JobResult<JobTicket> {
        let id = JobId::generate();
        let job = Job::queued(id.clone(), case, Some(self.inner.audit.reference()));
        self.inner.storage.create(job).await?;

        self.inner
            .record(&id, "job.queued", |b| b.detail("state", JobState::Queued))
            .await;
        info!(job_id = %id, "Job queued");

        let (done_tx, done_rx) = oneshot::channel();
        let (validated_tx, validated_rx) = oneshot::channel();
        let inner = self.inner.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let (state, pending) = inner.execute(&task_id).await;
            // The submitter may have dropped its ticket.
            let _ = done_tx.send(state);

            match pending {
                Some(case) => {
                    tokio::spawn(async move {
                        let attached = inner.validate_finished(&task_id, case).await;
                        let _ = validated_tx.send(attached);
                    });
                }
                None => {
                    let _ = validated_tx.send(false);
                }
            }
        });

        Ok(JobTicket::new(id, done_rx, validated_rx))
    }

    /// Snapshot of a job, if it exists.
    pub async fn get_job(&self, id: &JobId) -> JobResult<Option<Job>> {
        Ok(self.inner.storage.get(id).await?)
    }

    /// Poll storage until the job reaches a terminal state or `timeout` elapses.
    pub async fn wait_for(&self, id: &JobId, timeout: Duration) -> JobResult<Job> {
        let poll = self.inner.config.poll_interval();
        let waiting = async {
            loop {
                match self.inner.storage.get(id).await? {
                    Some(job) if job.is_terminal() => return Ok(job),
                    Some(_) => tokio::time::sleep(poll).await,
                    None => return Err(JobError::NotFound(id.clone())),
                }
            }
        };

        match tokio::time::timeout(timeout, waiting).await {
            Ok(result) => result,
            Err(_) => Err(JobError::Timeout {
                id: id.clone(),
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Run the validator pass against a stored job's input.
    ///
    /// Independent of the job's own state; the job record is not modified.
    pub async fn validate_job(&self, id: &JobId) -> JobResult<ValidationReport> {
        let job = self
            .inner
            .storage
            .get(id)
            .await?
            .ok_or_else(|| JobError::NotFound(id.clone()))?;
        let case = Arc::new(normalize(&job.input)?);
        Ok(self.inner.validators.run(case, Some(id)).await)
    }

    /// Run the validator pass against a case that has no job.
    pub async fn validate_case(&self, case: &Case) -> JobResult<ValidationReport> {
        let normalized = Arc::new(normalize(case)?);
        Ok(self.inner.validators.run(normalized, None).await)
    }
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("config", &self.inner.config)
            .field("audit", &self.inner.audit.reference())
            .finish_non_exhaustive()
    }
}

impl ManagerInner {
    /// Drive one job to a terminal state.
    ///
    /// Returns that state and, when a validator pass should follow, the
    /// normalized case it runs against.
    async fn execute(&self, id: &JobId) -> (JobState, Option<Arc<NormalizedCase>>) {
        let input = match self.storage.get(id).await {
            Ok(Some(job)) => job.input,
            Ok(None) => {
                error!(job_id = %id, "Job vanished before it started");
                return (JobState::Error, None);
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Failed to load job");
                return (JobState::Error, None);
            }
        };

        self.record(id, "job.started", |b| b).await;
        debug!(job_id = %id, "Job started");

        // A panic in the pipeline surfaces as a join error instead of
        // tearing down this task.
        let pipeline = self.pipeline.clone();
        let outcome = tokio::spawn(async move { pipeline.review(&input).await }).await;

        let (update, case) = match outcome {
            Ok(Ok(review)) => {
                let (update, case) = completed(id, review);
                (update, Some(case))
            }
            Ok(Err(e)) => (
                JobUpdate::new().state(JobState::Error).error(e.to_string()),
                None,
            ),
            Err(join) => (
                JobUpdate::new()
                    .state(JobState::Error)
                    .error(panic_detail(join)),
                None,
            ),
        };

        let state = self.finish(id, update).await;
        let pending = case.filter(|_| state == JobState::Done && self.config.run_validators);
        (state, pending)
    }

    /// Run the validator pass for a finished job and attach its outcomes.
    async fn validate_finished(&self, id: &JobId, case: Arc<NormalizedCase>) -> bool {
        let report = self.validators.run(case, Some(id)).await;
        debug!(job_id = %id, overall = ?report.overall, "Validator pass finished");
        match self.storage.attach_validators(id, report.outcomes).await {
            Ok(_) => true,
            Err(e) => {
                warn!(job_id = %id, error = %e, "Failed to attach validator outcomes");
                false
            }
        }
    }

    async fn finish(&self, id: &JobId, update: JobUpdate) -> JobState {
        let detail = update.error.clone();
        let state = match self.storage.update(id, update).await {
            Ok(job) => job.state,
            Err(e) => {
                error!(job_id = %id, error = %e, "Failed to store job result");
                let fallback = JobUpdate::new()
                    .state(JobState::Error)
                    .error(e.to_string());
                if let Err(e) = self.storage.update(id, fallback).await {
                    warn!(job_id = %id, error = %e, "Could not mark job as failed");
                }
                JobState::Error
            }
        };

        match (&state, detail) {
            (JobState::Done, _) => {
                self.record(id, "job.done", |b| b.detail("state", state)).await;
                info!(job_id = %id, "Job done");
            }
            (_, detail) => {
                let message = detail.unwrap_or_else(|| "job failed".to_string());
                error!(job_id = %id, error = %message, "Job failed");
                self.record(id, "job.error", |b| {
                    b.detail("state", state).detail("error", &message)
                })
                .await;
            }
        }
        state
    }

    /// Append a job event. Audit failures are logged, never propagated.
    async fn record<F>(&self, id: &JobId, action: &str, details: F)
    where
        F: FnOnce(caseboard_audit::AuditEventBuilder) -> caseboard_audit::AuditEventBuilder,
    {
        let builder = AuditEvent::builder()
            .actor(AUDIT_ACTOR)
            .action(action)
            .subject(id.as_str());
        let appended = match details(builder).build() {
            Ok(event) => self.audit.append(event).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = appended {
            warn!(job_id = %id, action, error = %e, "Failed to append audit event");
        }
    }
}

/// The `done` update for a reviewed job, and the case its validators run on.
fn completed(id: &JobId, review: Review) -> (JobUpdate, Arc<NormalizedCase>) {
    let Review {
        case,
        boards,
        consensus,
        mut card,
        ..
    } = review;
    card.attach_provenance(id);

    let update = JobUpdate::new()
        .state(JobState::Done)
        .boards(boards)
        .consensus(consensus)
        .protocol_card(card);
    (update, case)
}

/// Short text for a pipeline task that did not return normally.
fn panic_detail(join: tokio::task::JoinError) -> String {
    if !join.is_panic() {
        return "review pipeline was cancelled".to_string();
    }
    let payload = join.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("review pipeline panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("review pipeline panicked: {msg}")
    } else {
        "review pipeline panicked".to_string()
    }
}
