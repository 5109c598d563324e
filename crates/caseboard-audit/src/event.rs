//! Audit event types

use crate::error::{AuditError, AuditResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// An event appended to the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: Uuid,

    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// Component that emitted the event, e.g. `jobs` or `validators`
    pub actor: String,

    /// Dotted action name, e.g. `job.queued`
    pub action: String,

    /// What the event is about, usually a job id or case id
    pub subject: String,

    /// Free-form structured details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    /// Hash of the previous event in the sink
    #[serde(default)]
    pub previous_hash: Option<String>,

    /// Hash over this event's fields and `previous_hash`
    pub event_hash: String,
}

impl AuditEvent {
    /// Create a new audit event builder
    pub fn builder() -> AuditEventBuilder {
        AuditEventBuilder::default()
    }

    /// Recompute this event's hash; a mismatch means the event was altered.
    pub fn verify(&self) -> bool {
        compute_hash(
            &self.id,
            &self.timestamp,
            &self.actor,
            &self.action,
            &self.subject,
            self.details.as_ref(),
            self.previous_hash.as_deref(),
        ) == self.event_hash
    }
}

/// Builder for audit events
#[derive(Debug, Default)]
pub struct AuditEventBuilder {
    actor: Option<String>,
    action: Option<String>,
    subject: Option<String>,
    details: Map<String, Value>,
}

impl AuditEventBuilder {
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add a detail value. Values that fail to serialize are skipped.
    pub fn detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    /// Build the event (without hash - the sink chains it on append)
    pub fn build(self) -> AuditResult<PendingAuditEvent> {
        Ok(PendingAuditEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: self.actor.ok_or(AuditError::Incomplete("actor"))?,
            action: self.action.ok_or(AuditError::Incomplete("action"))?,
            subject: self.subject.ok_or(AuditError::Incomplete("subject"))?,
            details: if self.details.is_empty() {
                None
            } else {
                Some(Value::Object(self.details))
            },
        })
    }
}

/// An event not yet appended to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub subject: String,
    pub details: Option<Value>,
}

impl PendingAuditEvent {
    /// Chain onto `previous_hash` and seal the event.
    pub fn seal(self, previous_hash: Option<String>) -> AuditEvent {
        let event_hash = compute_hash(
            &self.id,
            &self.timestamp,
            &self.actor,
            &self.action,
            &self.subject,
            self.details.as_ref(),
            previous_hash.as_deref(),
        );

        AuditEvent {
            id: self.id,
            timestamp: self.timestamp,
            actor: self.actor,
            action: self.action,
            subject: self.subject,
            details: self.details,
            previous_hash,
            event_hash,
        }
    }
}

fn compute_hash(
    id: &Uuid,
    timestamp: &DateTime<Utc>,
    actor: &str,
    action: &str,
    subject: &str,
    details: Option<&Value>,
    previous_hash: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());
    for part in [actor, action, subject] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    if let Some(details) = details {
        hasher.update(details.to_string().as_bytes());
    }
    hasher.update(previous_hash.unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
}

/// Check that each event links to its predecessor and hashes correctly.
///
/// The first event may link to anything, so a tail of a longer trail
/// verifies as well.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    events.iter().all(AuditEvent::verify)
        && events
            .windows(2)
            .all(|w| w[1].previous_hash.as_deref() == Some(w[0].event_hash.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(action: &str) -> PendingAuditEvent {
        AuditEvent::builder()
            .actor("jobs")
            .action(action)
            .subject("job-1")
            .detail("state", "queued")
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_actor_action_and_subject() {
        let err = AuditEvent::builder().action("job.queued").subject("x").build();
        assert!(matches!(err, Err(AuditError::Incomplete("actor"))));
    }

    #[test]
    fn details_are_omitted_when_empty() {
        let event = AuditEvent::builder()
            .actor("jobs")
            .action("job.started")
            .subject("job-1")
            .build()
            .unwrap();
        assert!(event.details.is_none());
    }

    #[test]
    fn tampering_breaks_verification() {
        let first = pending("job.queued").seal(None);
        let second = pending("job.done").seal(Some(first.event_hash.clone()));
        assert!(verify_chain(&[first.clone(), second.clone()]));

        let mut altered = second;
        altered.subject = "job-2".into();
        assert!(!altered.verify());
        assert!(!verify_chain(&[first, altered]));
    }
}
