//! Crawl job lifecycle
//!
//! A [`PlayManager`] owns one job's frontier, task registry and counters,
//! and drives the state machine
//! `INITIATED → RUNNING → SHUTDOWN_INITIATED → {TERMINATED | COMPLETED}`.
//!
//! All of a job's state lives on the single-threaded context of the worker
//! that runs it, so it is shared between tasks with `Rc` and interior
//! mutability instead of locks. Frontier merges never suspend, so an
//! aborted task cannot leave a merge half-applied.

use crate::config::Config;
use crate::crawler::retry::{retriable, RetryOutcome};
use crate::crawler::{Frontier, TaskRegistry};
use crate::fetch::{FetchError, PlayFetcher};
use crate::state::{Failure, FailureKind, JobSnapshot, JobStatus, ProcessKind};
use crate::storage::{dump_records, output_prefix, ChunkWriter};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::watch;

/// Per-job knobs, resolved from the configuration at start time
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub retry_limit: u32,
    pub page_size: usize,
    pub details_batch_size: usize,
    pub read_retry_limit: u32,
    pub read_dir: PathBuf,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub max_records_per_file: usize,
    pub dump_retry_limit: u32,
}

impl JobSettings {
    /// `read_dir` defaults to the output directory
    pub fn from_config(config: &Config, read_dir: Option<PathBuf>) -> Self {
        let output_dir = PathBuf::from(&config.output.output_dir);
        Self {
            retry_limit: config.crawler.retry_limit,
            page_size: config.crawler.page_size,
            details_batch_size: config.crawler.details_batch_size,
            read_retry_limit: config.crawler.read_retry_limit,
            read_dir: read_dir.unwrap_or_else(|| output_dir.clone()),
            output_dir,
            file_prefix: config.output.file_prefix.clone(),
            max_records_per_file: config.output.max_records_per_file,
            dump_retry_limit: config.output.dump_retry_limit,
        }
    }
}

/// What drove a job into shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// External stop request; finalizes TERMINATED
    Requested,
    /// The job ran out of work; finalizes COMPLETED
    Completed,
}

#[derive(Debug, Default)]
struct Stats {
    records_found: usize,
    records_processed: usize,
    records_failed: usize,
    failures: Vec<Failure>,
    dump_success: Option<bool>,
    records: Option<Vec<String>>,
}

pub(crate) struct ManagerCore {
    id: String,
    kind: ProcessKind,
    pub(crate) settings: JobSettings,
    pub(crate) fetcher: Arc<dyn PlayFetcher>,
    logfile: Option<String>,
    status: Cell<JobStatus>,
    start_time: Cell<Option<DateTime<Utc>>>,
    stop_time: Cell<Option<DateTime<Utc>>>,
    pub(crate) frontier: RefCell<Frontier>,
    pub(crate) tasks: Rc<TaskRegistry>,
    stats: RefCell<Stats>,
    outcome: watch::Sender<Option<JobSnapshot>>,
}

/// Handle to one crawl job
///
/// Cheap to clone; every clone refers to the same job. Must only be used
/// from the thread that created it.
#[derive(Clone)]
pub struct PlayManager {
    pub(crate) core: Rc<ManagerCore>,
}

impl PlayManager {
    pub fn new(
        id: impl Into<String>,
        kind: ProcessKind,
        settings: JobSettings,
        fetcher: Arc<dyn PlayFetcher>,
        logfile: Option<String>,
    ) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            core: Rc::new(ManagerCore {
                id: id.into(),
                kind,
                settings,
                fetcher,
                logfile,
                status: Cell::new(JobStatus::Initiated),
                start_time: Cell::new(None),
                stop_time: Cell::new(None),
                frontier: RefCell::new(Frontier::new()),
                tasks: TaskRegistry::new(),
                stats: RefCell::new(Stats::default()),
                outcome,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.core.id
    }

    pub fn kind(&self) -> ProcessKind {
        self.core.kind
    }

    pub fn status(&self) -> JobStatus {
        self.core.status.get()
    }

    pub fn is_closing(&self) -> bool {
        self.status().is_closing()
    }

    /// Live number of records in the frontier
    pub fn records_collected(&self) -> usize {
        self.core.frontier.borrow().len()
    }

    /// Dump path without the chunk index
    pub fn optfile(&self) -> PathBuf {
        let settings = &self.core.settings;
        output_prefix(&settings.output_dir, &settings.file_prefix, &self.core.id, self.core.kind)
    }

    fn transition(&self, next: JobStatus) {
        let current = self.status();
        if !current.can_transition_to(next) {
            tracing::warn!("Job {} skipping transition {} -> {}", self.core.id, current, next);
        }
        self.core.status.set(next);
    }

    /// Moves the job to RUNNING and schedules its seed work
    ///
    /// Must be called from inside a `LocalSet`. Returns the number of seed
    /// tasks scheduled; zero means the job has nothing to do and will
    /// complete as soon as its driver notices.
    pub fn start(&self) -> usize {
        if self.status() != JobStatus::Initiated {
            tracing::warn!("Job {} already started", self.core.id);
            return 0;
        }
        self.core.start_time.set(Some(Utc::now()));
        self.transition(JobStatus::Running);

        let scheduled = match self.core.kind {
            ProcessKind::Discover => self.schedule_discovery(),
            ProcessKind::Details => self.schedule_enrichment(),
        };
        tracing::info!(
            "Job {} ({}) running with {} seed tasks",
            self.core.id,
            self.core.kind,
            scheduled
        );
        scheduled
    }

    /// Spawns a task on this job's registry
    pub(crate) fn schedule<F>(&self, fut: F, shield: bool) -> bool
    where
        F: Future<Output = ()> + 'static,
    {
        if self.status().is_terminal() {
            return false;
        }
        self.core.tasks.schedule(fut, shield)
    }

    /// Runs a fetch unit under the job's retry policy
    pub(crate) async fn retry_fetch<T, F, Fut>(&self, op: F, shield: bool) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        retriable(op, self.core.settings.retry_limit, shield, || self.is_closing()).await
    }

    pub(crate) fn add_processed(&self, count: usize) {
        self.core.stats.borrow_mut().records_processed += count;
    }

    pub(crate) fn add_failed(&self) {
        self.core.stats.borrow_mut().records_failed += 1;
    }

    pub(crate) fn push_failure(&self, kind: FailureKind, message: impl Into<String>) {
        self.core.stats.borrow_mut().failures.push(Failure::new(kind, message));
    }

    /// Current view of the job
    ///
    /// Once the job is closed this is the final outcome recorded by
    /// [`shutdown`](Self::shutdown).
    pub fn peek(&self, show_records: bool) -> JobSnapshot {
        if let Some(outcome) = self.core.outcome.borrow().as_ref() {
            return outcome.clone().with_records(show_records);
        }
        self.snapshot(show_records)
    }

    fn snapshot(&self, show_records: bool) -> JobSnapshot {
        let status = self.status();
        let start = self.core.start_time.get();
        let stop = self.core.stop_time.get();
        let stats = self.core.stats.borrow();

        let mut snapshot = JobSnapshot::initiated(self.core.id.clone(), self.core.kind, self.core.logfile.clone());
        snapshot.status = status;
        snapshot.start_time = start;
        snapshot.stop_time = stop;
        snapshot.records_found = stats.records_found;
        snapshot.records_processed = stats.records_processed;
        snapshot.records_failed = stats.records_failed;
        snapshot.failures = stats.failures.clone();
        snapshot.dump_success = stats.dump_success;

        if status.is_terminal() {
            snapshot.total_time_taken = start.zip(stop).map(|(start, stop)| seconds_between(start, stop));
            snapshot.optfile = Some(self.optfile().display().to_string());
            if show_records {
                snapshot.records = stats.records.clone();
            }
        } else {
            let frontier = self.core.frontier.borrow();
            snapshot.time_elapsed = start.map(|start| seconds_between(start, Utc::now()));
            snapshot.records_collected = Some(frontier.len());
            if show_records {
                snapshot.records = Some(frontier.ids());
            }
        }

        snapshot
    }

    /// Resolves once the job has no task in flight
    pub async fn idle(&self) {
        self.core.tasks.wait_idle().await
    }

    /// Resolves with the final snapshot once the job is closed
    pub async fn closed(&self) -> JobSnapshot {
        let mut outcome = self.core.outcome.subscribe();
        if let Ok(snapshot) = outcome.wait_for(Option::is_some).await {
            if let Some(snapshot) = snapshot.as_ref() {
                return snapshot.clone();
            }
        }
        self.snapshot(true)
    }

    /// Runs the shutdown protocol, or joins the one already in progress
    ///
    /// The first caller cancels cancellable tasks, drains shielded ones,
    /// dumps the frontier and records the terminal status. Every caller
    /// gets the same final snapshot, records included.
    pub async fn shutdown(&self, reason: ShutdownReason) -> JobSnapshot {
        if self.is_closing() {
            return self.closed().await;
        }
        if self.status() == JobStatus::Initiated {
            self.core.start_time.set(Some(Utc::now()));
            self.transition(JobStatus::Running);
        }

        self.transition(JobStatus::ShutdownInitiated);
        tracing::info!("Job {} shutting down ({:?})", self.core.id, reason);

        let cancelled = self.core.tasks.cancel_all();
        let drained = self.core.tasks.drain_shielded().await;
        tracing::debug!(
            "Job {} cancelled {} tasks, drained {} shielded tasks",
            self.core.id,
            cancelled,
            drained
        );

        self.dump();
        self.core.stop_time.set(Some(Utc::now()));
        self.transition(match reason {
            ShutdownReason::Requested => JobStatus::Terminated,
            ShutdownReason::Completed => JobStatus::Completed,
        });

        let snapshot = self.snapshot(true);
        self.core.frontier.borrow_mut().release();
        self.core.outcome.send_replace(Some(snapshot.clone()));

        tracing::info!(
            "Job {} {} with {} records ({} processed, {} failed)",
            self.core.id,
            snapshot.status,
            snapshot.records_found,
            snapshot.records_processed,
            snapshot.records_failed
        );
        snapshot
    }

    /// Writes the frontier as chunked JSON
    fn dump(&self) {
        let frontier = self.core.frontier.borrow();
        if frontier.is_empty() {
            tracing::warn!("Job {} has no records to dump", self.core.id);
            let mut stats = self.core.stats.borrow_mut();
            stats.records_found = 0;
            stats.records = Some(Vec::new());
            return;
        }

        let settings = &self.core.settings;
        let writer = ChunkWriter::new(self.optfile(), settings.dump_retry_limit);
        let report = dump_records(frontier.records(), &writer, settings.max_records_per_file);
        let ids = frontier.ids();
        drop(frontier);

        let mut stats = self.core.stats.borrow_mut();
        stats.dump_success = Some(report.success());
        if !report.success() {
            let chunks: Vec<String> = report
                .failed
                .iter()
                .map(|(index, e)| format!("chunk {}: {}", index, e))
                .collect();
            tracing::error!("Job {} failed to dump {}", self.core.id, chunks.join("; "));
            stats
                .failures
                .push(Failure::new(FailureKind::DataDumpFailure, chunks.join("; ")));
        } else {
            tracing::info!(
                "Job {} dumped {} records into {} files",
                self.core.id,
                ids.len(),
                report.files.len()
            );
        }
        stats.records_found = ids.len();
        stats.records = Some(ids);
    }
}

fn seconds_between(start: DateTime<Utc>, stop: DateTime<Utc>) -> f64 {
    (stop - start).num_milliseconds() as f64 / 1000.0
}
