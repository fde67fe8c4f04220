//! Process-wide directory of crawl jobs
//!
//! The registry is the only state shared across threads. It is created by
//! the caller and handed explicitly to both the control surface and the
//! workers; there is no global instance.

use crate::state::{Failure, FailureKind, JobSnapshot, JobStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::{mpsc, oneshot, Notify};

/// Request routed to a running job's driver
#[derive(Debug)]
pub enum JobCommand {
    Peek {
        show_records: bool,
        reply: oneshot::Sender<JobSnapshot>,
    },
    Stop {
        reply: oneshot::Sender<JobSnapshot>,
    },
}

/// Sending half of a running job's command channel
#[derive(Debug, Clone)]
pub struct JobControl {
    sender: mpsc::UnboundedSender<JobCommand>,
}

impl JobControl {
    pub fn new(sender: mpsc::UnboundedSender<JobCommand>) -> Self {
        Self { sender }
    }

    /// Live snapshot; `None` once the driver has gone away
    pub async fn peek(&self, show_records: bool) -> Option<JobSnapshot> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(JobCommand::Peek { show_records, reply })
            .ok()?;
        response.await.ok()
    }

    /// Asks the job to shut down without waiting for it
    pub fn request_stop(&self) -> Option<oneshot::Receiver<JobSnapshot>> {
        let (reply, response) = oneshot::channel();
        self.sender.send(JobCommand::Stop { reply }).ok()?;
        Some(response)
    }
}

/// What the registry knows about one job
#[derive(Debug, Clone)]
pub enum ManagerEntry {
    /// Not picked up by a worker yet, or failed to initialize
    Placeholder(JobSnapshot),

    /// Running on a worker; `snapshot` is the view at attach time
    Running {
        snapshot: JobSnapshot,
        control: JobControl,
    },

    /// Shut down; holds the final snapshot
    Closed(JobSnapshot),
}

impl ManagerEntry {
    /// Last snapshot recorded in the registry
    pub fn snapshot(&self) -> &JobSnapshot {
        match self {
            Self::Placeholder(snapshot) | Self::Closed(snapshot) => snapshot,
            Self::Running { snapshot, .. } => snapshot,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.snapshot().status
    }
}

#[derive(Default)]
pub struct ManagerRegistry {
    entries: RwLock<HashMap<String, ManagerEntry>>,
    closed: Notify,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job that has not reached a worker yet
    pub fn insert_placeholder(&self, snapshot: JobSnapshot) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.process_id.clone(), ManagerEntry::Placeholder(snapshot));
    }

    /// Replaces the placeholder with a running job
    pub fn attach(&self, snapshot: JobSnapshot, control: JobControl) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                snapshot.process_id.clone(),
                ManagerEntry::Running { snapshot, control },
            );
    }

    /// Records a job's final snapshot
    pub fn close(&self, snapshot: JobSnapshot) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.process_id.clone(), ManagerEntry::Closed(snapshot));
        self.closed.notify_waiters();
    }

    /// Marks a job that never got its execution context
    pub fn corrupt(&self, process_id: &str, cause: impl Into<String>) {
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(ManagerEntry::Placeholder(snapshot)) = entries.get_mut(process_id) {
                snapshot.status = JobStatus::Corrupted;
                snapshot.stop_time = Some(Utc::now());
                snapshot
                    .failures
                    .push(Failure::new(FailureKind::InitializationFailure, cause));
            }
        }
        self.closed.notify_waiters();
    }

    pub fn get(&self, process_id: &str) -> Option<ManagerEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(process_id)
            .cloned()
    }

    /// All entries, ordered by start time then id
    pub fn entries(&self) -> Vec<ManagerEntry> {
        let mut entries: Vec<ManagerEntry> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            let (a, b) = (a.snapshot(), b.snapshot());
            (a.start_time, &a.process_id).cmp(&(b.start_time, &b.process_id))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves with the final snapshot once the job is closed or corrupted
    ///
    /// Returns `None` for an unknown id.
    pub async fn wait_closed(&self, process_id: &str) -> Option<JobSnapshot> {
        loop {
            let notified = self.closed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.get(process_id)? {
                ManagerEntry::Closed(snapshot) => return Some(snapshot),
                ManagerEntry::Placeholder(snapshot) if snapshot.status.is_terminal() => {
                    return Some(snapshot)
                }
                _ => notified.await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ProcessKind;
    use std::sync::Arc;

    fn placeholder(id: &str) -> JobSnapshot {
        JobSnapshot::initiated(id, ProcessKind::Discover, None)
    }

    #[test]
    fn test_placeholder_then_running_then_closed() {
        let registry = ManagerRegistry::new();
        registry.insert_placeholder(placeholder("a"));
        assert_eq!(registry.get("a").unwrap().status(), JobStatus::Initiated);

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut running = placeholder("a");
        running.status = JobStatus::Running;
        registry.attach(running, JobControl::new(tx));
        assert!(matches!(registry.get("a"), Some(ManagerEntry::Running { .. })));

        let mut done = placeholder("a");
        done.status = JobStatus::Terminated;
        registry.close(done);
        assert_eq!(registry.get("a").unwrap().status(), JobStatus::Terminated);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_corrupt_records_failure() {
        let registry = ManagerRegistry::new();
        registry.insert_placeholder(placeholder("a"));
        registry.corrupt("a", "no runtime");

        let entry = registry.get("a").unwrap();
        let snapshot = entry.snapshot();
        assert_eq!(snapshot.status, JobStatus::Corrupted);
        assert_eq!(snapshot.failures[0].kind, FailureKind::InitializationFailure);
        assert!(snapshot.stop_time.is_some());
    }

    #[tokio::test]
    async fn test_wait_closed_wakes_on_close() {
        let registry = Arc::new(ManagerRegistry::new());
        registry.insert_placeholder(placeholder("a"));

        let closer = Arc::clone(&registry);
        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            let mut done = placeholder("a");
            done.status = JobStatus::Completed;
            closer.close(done);
        });

        let snapshot = registry.wait_closed("a").await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        handle.await.unwrap();

        assert!(registry.wait_closed("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_control_reports_gone_driver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let control = JobControl::new(tx);
        assert!(control.peek(false).await.is_none());
        assert!(control.request_stop().is_none());
    }
}
