//! Audit sinks: the single append-only trail shared by jobs and validators

use crate::error::AuditResult;
use crate::event::{AuditEvent, PendingAuditEvent};
use async_trait::async_trait;
use parking_lot::{Mutex as SyncMutex, RwLock};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Trait for audit sinks
///
/// Appends are serialized by the sink; `tail` never waits on an append.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append an event, chaining it to the previous one.
    async fn append(&self, event: PendingAuditEvent) -> AuditResult<AuditEvent>;

    /// Up to `limit` most recent events, newest last.
    async fn tail(&self, limit: usize) -> AuditResult<Vec<AuditEvent>>;

    /// Reference string recorded on jobs as their audit trail.
    fn reference(&self) -> String;
}

/// In-memory audit sink
///
/// Sealing happens under the writer section only; the event list is
/// write-locked just for the push, so readers wait at most one push.
pub struct MemoryAuditSink {
    /// Hash of the last appended event; the lock is the writer section.
    writer: SyncMutex<Option<String>>,
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self {
            writer: SyncMutex::new(None),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Get all events
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    /// Events with the given action, oldest first.
    pub fn with_action(&self, action: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, pending: PendingAuditEvent) -> AuditResult<AuditEvent> {
        let mut last_hash = self.writer.lock();
        let event = pending.seal(last_hash.take());
        self.events.write().push(event.clone());
        *last_hash = Some(event.event_hash.clone());
        Ok(event)
    }

    async fn tail(&self, limit: usize) -> AuditResult<Vec<AuditEvent>> {
        let events = self.events.read();
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }

    fn reference(&self) -> String {
        "memory".to_string()
    }
}

/// File-based audit sink writing one JSON event per line
pub struct FileAuditSink {
    path: PathBuf,
    /// Hash of the last appended event; the lock is the writer section.
    last_hash: Mutex<Option<String>>,
}

impl FileAuditSink {
    /// Open (or create) the trail at `path`, resuming its chain.
    pub async fn open(path: impl Into<PathBuf>) -> AuditResult<Self> {
        let path = path.into();
        let last_hash = if tokio::fs::try_exists(&path).await? {
            Self::read_events(&path)
                .await?
                .last()
                .map(|e| e.event_hash.clone())
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            None
        };

        Ok(Self {
            path,
            last_hash: Mutex::new(last_hash),
        })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all events from the file
    pub async fn read_all(&self) -> AuditResult<Vec<AuditEvent>> {
        Self::read_events(&self.path).await
    }

    async fn read_events(path: &Path) -> AuditResult<Vec<AuditEvent>> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(Vec::new());
        }

        let file = File::open(path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEvent>(&line) {
                Ok(event) => events.push(event),
                // A line still being written by a concurrent append.
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable audit line"),
            }
        }

        Ok(events)
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn append(&self, pending: PendingAuditEvent) -> AuditResult<AuditEvent> {
        let mut last_hash = self.last_hash.lock().await;
        let event = pending.seal(last_hash.clone());

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        *last_hash = Some(event.event_hash.clone());
        Ok(event)
    }

    async fn tail(&self, limit: usize) -> AuditResult<Vec<AuditEvent>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut window = VecDeque::with_capacity(limit.min(1024));
        for event in self.read_all().await? {
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(event);
        }
        Ok(window.into())
    }

    fn reference(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::verify_chain;

    fn pending(action: &str, subject: &str) -> PendingAuditEvent {
        AuditEvent::builder()
            .actor("test")
            .action(action)
            .subject(subject)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_memory_sink_reads_while_writer_is_busy() {
        let sink = MemoryAuditSink::new();
        sink.append(pending("job.queued", "job-0")).await.unwrap();

        // Stand-in for an append that is still sealing.
        let _sealing = sink.writer.lock();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.with_action("job.queued").len(), 1);
        assert_eq!(sink.tail(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_sink_tail_is_newest_last() {
        let sink = MemoryAuditSink::new();
        for i in 0..5 {
            sink.append(pending("job.queued", &format!("job-{i}")))
                .await
                .unwrap();
        }

        let tail = sink.tail(2).await.unwrap();
        let subjects: Vec<_> = tail.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["job-3", "job-4"]);

        assert_eq!(sink.tail(50).await.unwrap().len(), 5);
        assert!(sink.tail(0).await.unwrap().is_empty());
        assert!(verify_chain(&sink.events()));
    }

    #[tokio::test]
    async fn test_memory_sink_concurrent_appends_stay_chained() {
        let sink = std::sync::Arc::new(MemoryAuditSink::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                sink.append(pending("validation.report", &format!("case-{i}")))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(sink.len(), 16);
        assert!(verify_chain(&sink.events()));
    }

    #[tokio::test]
    async fn test_file_sink() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("logs").join("audit.ndjson");

        let sink = FileAuditSink::open(&path).await.unwrap();
        sink.append(pending("job.queued", "job-1")).await.unwrap();
        sink.append(pending("job.started", "job-1")).await.unwrap();
        sink.append(pending("job.done", "job-1")).await.unwrap();

        let events = sink.read_all().await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(verify_chain(&events));

        let tail = sink.tail(1).await.unwrap();
        assert_eq!(tail[0].action, "job.done");
        assert_eq!(sink.reference(), path.display().to_string());
    }

    #[tokio::test]
    async fn test_file_sink_resumes_chain_after_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("audit.ndjson");

        {
            let sink = FileAuditSink::open(&path).await.unwrap();
            sink.append(pending("job.queued", "job-1")).await.unwrap();
            sink.append(pending("job.done", "job-1")).await.unwrap();
        }

        let sink = FileAuditSink::open(&path).await.unwrap();
        sink.append(pending("job.queued", "job-2")).await.unwrap();

        let events = sink.read_all().await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(verify_chain(&events));
    }

    #[tokio::test]
    async fn test_file_sink_tail_of_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = FileAuditSink::open(temp_dir.path().join("audit.ndjson"))
            .await
            .unwrap();
        assert!(sink.tail(10).await.unwrap().is_empty());
    }
}
