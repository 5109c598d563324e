//! The validator runner.
//!
//! A run moves through `started → dispatched → collected → reduced →
//! reported`. Validators are dispatched in policy order onto the blocking
//! pool, at most `policy.concurrency()` at a time. A validator that errors
//! or panics is reported as a `block` outcome with reason code
//! [`EXCEPTION_CODE`]; it never stops its siblings.

use crate::policy::ValidatorPolicy;
use crate::registry::ValidatorRegistry;
use crate::validator::{ValidationFinding, Validator};
use caseboard_audit::{AuditEvent, AuditSink};
use caseboard_types::{
    Decision, JobId, NormalizedCase, OutcomeSeverity, Reason, ValidationReport, ValidatorOutcome,
    ValidatorSource,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Engine identifier stamped on every report.
pub const ENGINE_VERSION: &str = concat!("caseboard-validators@", env!("CARGO_PKG_VERSION"));

/// Reason code of an outcome synthesized from a validator fault.
pub const EXCEPTION_CODE: &str = "VALIDATOR_EXCEPTION";

/// Phases of a validator run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Started,
    Dispatched,
    Collected,
    Reduced,
    Reported,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Started => "started",
            RunPhase::Dispatched => "dispatched",
            RunPhase::Collected => "collected",
            RunPhase::Reduced => "reduced",
            RunPhase::Reported => "reported",
        }
    }
}

/// Runs the validator pass over one case at a time.
#[derive(Clone)]
pub struct ValidatorRunner {
    validators: Vec<Arc<dyn Validator>>,
    policy: ValidatorPolicy,
    audit: Option<Arc<dyn AuditSink>>,
}

impl ValidatorRunner {
    pub fn new(registry: &ValidatorRegistry, policy: ValidatorPolicy) -> Self {
        let validators = policy.arrange(&registry.discover());
        Self {
            validators,
            policy,
            audit: None,
        }
    }

    /// Append every completed report to `sink`.
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn policy(&self) -> &ValidatorPolicy {
        &self.policy
    }

    /// Validator codes in dispatch order.
    pub fn dispatch_order(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.code()).collect()
    }

    /// Run every validator against `case` and reduce the outcomes.
    ///
    /// Never fails; faults become outcomes. Outcomes are listed in dispatch
    /// order regardless of completion order.
    pub async fn run(&self, case: Arc<NormalizedCase>, job_id: Option<&JobId>) -> ValidationReport {
        let started_at = Utc::now();
        let case_id = case
            .case_id
            .clone()
            .or_else(|| job_id.map(JobId::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        log_phase(RunPhase::Started, &case_id);

        let semaphore = Arc::new(Semaphore::new(self.policy.concurrency()));
        let mut dispatched = Vec::with_capacity(self.validators.len());

        for validator in &self.validators {
            // Waits here while the pool is full, so dispatch follows policy order.
            let permit = semaphore.clone().acquire_owned().await.ok();
            let task_validator = validator.clone();
            let task_case = case.clone();
            debug!(validator = validator.code(), case_id = %case_id, "Dispatching validator");

            let dispatched_at = Instant::now();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                task_validator.run(&task_case)
            });
            // Timed per task, so a panicking validator still reports its own duration.
            dispatched.push(async move {
                let joined = handle.await;
                (joined, dispatched_at.elapsed())
            });
        }
        log_phase(RunPhase::Dispatched, &case_id);

        let joined = futures::future::join_all(dispatched).await;
        log_phase(RunPhase::Collected, &case_id);

        let outcomes: Vec<ValidatorOutcome> = self
            .validators
            .iter()
            .zip(joined)
            .map(|(validator, (joined, elapsed))| match joined {
                Ok(Ok(findings)) => self.collapse(validator.as_ref(), findings, elapsed),
                Ok(Err(e)) => {
                    warn!(validator = validator.code(), error = %e, "Validator failed");
                    exception_outcome(validator.as_ref(), e.to_string(), elapsed)
                }
                Err(e) => {
                    let message = panic_message(e);
                    warn!(validator = validator.code(), error = %message, "Validator panicked");
                    exception_outcome(validator.as_ref(), message, elapsed)
                }
            })
            .collect();

        let overall = ValidationReport::reduce_overall(&outcomes);
        log_phase(RunPhase::Reduced, &case_id);
        info!(
            case_id = %case_id,
            overall = %overall,
            outcomes = outcomes.len(),
            "Validation report reduced"
        );

        let report = ValidationReport {
            job_id: job_id.cloned(),
            case_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            overall,
            engine_version: ENGINE_VERSION.to_string(),
        };

        self.append_report(&report).await;
        log_phase(RunPhase::Reported, &report.case_id);
        report
    }

    /// Collapse a validator's findings into one outcome at the worst severity.
    fn collapse(
        &self,
        validator: &dyn Validator,
        findings: Vec<ValidationFinding>,
        elapsed: Duration,
    ) -> ValidatorOutcome {
        let mut decision = Decision::Allow;
        let mut severity = OutcomeSeverity::Info;
        let mut reasons = Vec::with_capacity(findings.len().max(1));

        for finding in findings {
            let (d, s) = self
                .policy
                .severity_for(&finding.code, finding.severity)
                .collapse();
            if d.rank() > decision.rank() {
                decision = d;
                severity = s;
            }
            let reason = Reason::new(finding.code, finding.message);
            reasons.push(match finding.data_path {
                Some(path) => reason.with_data_path(path),
                None => reason,
            });
        }
        if reasons.is_empty() {
            reasons.push(Reason::new("OK", "Passed"));
        }

        ValidatorOutcome {
            validator_name: validator.code().to_string(),
            decision,
            severity,
            reasons,
            source: source_of(validator),
            duration_ms: Some(elapsed.as_millis() as u64),
        }
    }

    async fn append_report(&self, report: &ValidationReport) {
        let Some(sink) = &self.audit else {
            return;
        };
        let event = AuditEvent::builder()
            .actor("validators")
            .action("validation.report")
            .subject(report.case_id.clone())
            .detail("job_id", &report.job_id)
            .detail("overall", report.overall)
            .detail("report", report)
            .build();
        let appended = match event {
            Ok(event) => sink.append(event).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = appended {
            warn!(case_id = %report.case_id, error = %e, "Failed to append validation report");
        }
    }
}

impl std::fmt::Debug for ValidatorRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRunner")
            .field("validators", &self.dispatch_order())
            .field("policy", &self.policy)
            .field("audit", &self.audit.as_ref().map(|a| a.reference()))
            .finish()
    }
}

fn log_phase(phase: RunPhase, case_id: &str) {
    debug!(phase = phase.as_str(), case_id = %case_id, "Validator run phase");
}

fn source_of(validator: &dyn Validator) -> ValidatorSource {
    ValidatorSource {
        component: validator.component().to_string(),
        version: validator.version().to_string(),
    }
}

fn exception_outcome(validator: &dyn Validator, message: String, elapsed: Duration) -> ValidatorOutcome {
    ValidatorOutcome {
        validator_name: validator.code().to_string(),
        decision: Decision::Block,
        severity: OutcomeSeverity::Critical,
        reasons: vec![Reason::new(EXCEPTION_CODE, message)],
        source: source_of(validator),
        duration_ms: Some(elapsed.as_millis() as u64),
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("validator panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("validator panicked: {s}")
    } else {
        "validator panicked".to_string()
    }
}
