//! Assembles the pipeline, validator runner, audit sink and job manager.

use crate::config::{AuditSinkKind, CaseboardConfig};
use crate::error::DaemonResult;
use caseboard_audit::{AuditEvent, AuditSink, FileAuditSink, MemoryAuditSink};
use caseboard_jobs::{InMemoryJobStorage, JobError, JobManager};
use caseboard_review::{BoardRegistry, ReferenceBoards, ReviewPipeline};
use caseboard_types::{Case, Job, ValidationReport};
use caseboard_validators::{ValidatorRegistry, ValidatorRunner};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// A wired caseboard instance.
#[derive(Clone, Debug)]
pub struct Caseboard {
    manager: JobManager,
}

impl Caseboard {
    /// Build with the reference boards and built-in validators.
    pub async fn from_config(config: &CaseboardConfig) -> DaemonResult<Self> {
        Self::builder(config).build().await
    }

    pub fn builder(config: &CaseboardConfig) -> CaseboardBuilder {
        CaseboardBuilder {
            config: config.clone(),
            boards: None,
            validators: None,
        }
    }

    pub fn manager(&self) -> &JobManager {
        &self.manager
    }

    /// Submit a case and wait for its job to finish.
    ///
    /// Waits on the job's completion signal rather than polling, so the
    /// closing audit event is already appended when this returns. The
    /// validator pass that follows gets whatever is left of `timeout`; if it
    /// overruns, the job is returned without its validator outcomes.
    pub async fn run_case(&self, case: Case, timeout: Duration) -> DaemonResult<Job> {
        let deadline = Instant::now() + timeout;
        let mut ticket = self.manager.submit(case).await?;
        let id = ticket.id.clone();
        match tokio::time::timeout_at(deadline, ticket.completed()).await {
            Ok(state) => {
                state?;
            }
            Err(_) => {
                return Err(JobError::Timeout {
                    id,
                    waited_ms: timeout.as_millis() as u64,
                }
                .into())
            }
        }
        match tokio::time::timeout_at(deadline, ticket.validated()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(job_id = %id, error = %e, "Validator pass did not report"),
            Err(_) => warn!(job_id = %id, "Validator pass still running at deadline"),
        }
        self.manager
            .get_job(&id)
            .await?
            .ok_or_else(|| JobError::NotFound(id).into())
    }

    /// Run the validator pass alone.
    pub async fn validate(&self, case: &Case) -> DaemonResult<ValidationReport> {
        Ok(self.manager.validate_case(case).await?)
    }

    /// Most recent audit events, oldest first.
    pub async fn audit_tail(&self, limit: usize) -> DaemonResult<Vec<AuditEvent>> {
        Ok(self.manager.audit().tail(limit).await?)
    }
}

/// Builder for [`Caseboard`], for swapping in custom boards or validators.
#[derive(Debug)]
pub struct CaseboardBuilder {
    config: CaseboardConfig,
    boards: Option<BoardRegistry>,
    validators: Option<ValidatorRegistry>,
}

impl CaseboardBuilder {
    pub fn boards(mut self, registry: BoardRegistry) -> Self {
        self.boards = Some(registry);
        self
    }

    pub fn validators(mut self, registry: ValidatorRegistry) -> Self {
        self.validators = Some(registry);
        self
    }

    pub async fn build(self) -> DaemonResult<Caseboard> {
        let audit = open_sink(&self.config).await?;

        let boards = self.boards.unwrap_or_else(ReferenceBoards::registry);
        let pipeline = ReviewPipeline::new(
            Arc::new(boards),
            self.config.consensus.clone(),
            self.config.synthesis.clone(),
        );

        let validators = match self.validators {
            Some(registry) => registry,
            None => ValidatorRegistry::builtin()?,
        };
        let runner = ValidatorRunner::new(&validators, self.config.validators.clone())
            .with_audit(audit.clone());

        info!(
            audit = %audit.reference(),
            boards = ?pipeline.registry().ids(),
            validators = ?runner.dispatch_order(),
            "Caseboard assembled"
        );

        let manager = JobManager::new(
            Arc::new(InMemoryJobStorage::new()),
            Arc::new(pipeline),
            Arc::new(runner),
            audit,
            self.config.jobs.clone(),
        );
        Ok(Caseboard { manager })
    }
}

async fn open_sink(config: &CaseboardConfig) -> DaemonResult<Arc<dyn AuditSink>> {
    Ok(match config.audit.sink {
        AuditSinkKind::Memory => Arc::new(MemoryAuditSink::new()),
        AuditSinkKind::File => Arc::new(FileAuditSink::open(config.audit.path.clone()).await?),
    })
}
