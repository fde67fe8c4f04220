//! Control operations behind the API and the CLI
//!
//! A [`Controller`] routes start/stop/peek/flush/view requests to jobs
//! through the shared [`ManagerRegistry`], delegating new jobs to the
//! [`WorkerPool`].

use crate::config::Config;
use crate::control::delegate::{run_job, JobSpec};
use crate::control::{ControlError, ManagerEntry, ManagerRegistry, WorkerPool};
use crate::crawler::JobSettings;
use crate::fetch::{HttpPlayFetcher, PlayFetcher};
use crate::state::{JobSnapshot, JobStatus, ProcessKind};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Reply to a start request
#[derive(Debug, Clone, Serialize)]
pub struct StartedJob {
    pub process_id: String,
    pub logfile: Option<String>,
}

#[derive(Clone)]
pub struct Controller {
    config: Arc<Config>,
    registry: Arc<ManagerRegistry>,
    pool: Arc<WorkerPool>,
    fetcher: Arc<dyn PlayFetcher>,
    logfile: Option<String>,
}

impl Controller {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ManagerRegistry>,
        pool: Arc<WorkerPool>,
        fetcher: Arc<dyn PlayFetcher>,
        logfile: Option<String>,
    ) -> Self {
        Self {
            config,
            registry,
            pool,
            fetcher,
            logfile,
        }
    }

    /// Builds the HTTP collaborator, the worker pool and an empty registry
    pub fn from_config(config: Config, logfile: Option<String>) -> crate::Result<Self> {
        let fetcher: Arc<dyn PlayFetcher> = Arc::new(HttpPlayFetcher::new(&config.fetch)?);
        let pool = Arc::new(WorkerPool::new(config.pool.workers, &config.pool.thread_prefix)?);
        Ok(Self::new(
            Arc::new(config),
            Arc::new(ManagerRegistry::new()),
            pool,
            fetcher,
            logfile,
        ))
    }

    pub fn registry(&self) -> &Arc<ManagerRegistry> {
        &self.registry
    }

    pub fn fetcher(&self) -> &Arc<dyn PlayFetcher> {
        &self.fetcher
    }

    /// Registers a job and hands it to a worker
    pub fn start(&self, kind: ProcessKind, read_dir: Option<PathBuf>) -> Result<StartedJob, ControlError> {
        let process_id = Uuid::new_v4().simple().to_string();
        self.registry.insert_placeholder(JobSnapshot::initiated(
            process_id.clone(),
            kind,
            self.logfile.clone(),
        ));

        let spec = JobSpec {
            process_id: process_id.clone(),
            kind,
            settings: JobSettings::from_config(&self.config, read_dir),
            fetcher: Arc::clone(&self.fetcher),
            logfile: self.logfile.clone(),
        };
        let registry = Arc::clone(&self.registry);
        if let Err(e) = self.pool.execute(move || run_job(spec, registry)) {
            self.registry.corrupt(&process_id, e.to_string());
            return Err(e);
        }

        tracing::info!("Started {} process {}", kind, process_id);
        Ok(StartedJob {
            process_id,
            logfile: self.logfile.clone(),
        })
    }

    fn entry(&self, process_id: &str) -> Result<ManagerEntry, ControlError> {
        self.registry
            .get(process_id)
            .ok_or_else(|| ControlError::NotFound(process_id.to_string()))
    }

    fn not_running(process_id: &str) -> ControlError {
        ControlError::Unprocessable(format!("Process {} has not started running yet", process_id))
    }

    /// Snapshot of one job
    pub async fn peek(&self, process_id: &str, show_records: bool) -> Result<JobSnapshot, ControlError> {
        match self.entry(process_id)? {
            ManagerEntry::Placeholder(snapshot) if snapshot.status == JobStatus::Initiated => {
                Err(Self::not_running(process_id))
            }
            ManagerEntry::Placeholder(snapshot) | ManagerEntry::Closed(snapshot) => {
                Ok(snapshot.with_records(show_records))
            }
            ManagerEntry::Running { control, .. } => match control.peek(show_records).await {
                Some(snapshot) => Ok(snapshot),
                None => self.closed_snapshot(process_id, show_records).await,
            },
        }
    }

    /// Runs a job's shutdown protocol and returns its final snapshot
    ///
    /// Stopping a job that is already closed returns the same snapshot.
    pub async fn stop(&self, process_id: &str, show_records: bool) -> Result<JobSnapshot, ControlError> {
        match self.entry(process_id)? {
            ManagerEntry::Placeholder(snapshot) if snapshot.status == JobStatus::Initiated => {
                Err(Self::not_running(process_id))
            }
            ManagerEntry::Placeholder(snapshot) | ManagerEntry::Closed(snapshot) => {
                Ok(snapshot.with_records(show_records))
            }
            ManagerEntry::Running { control, .. } => {
                let reply = match control.request_stop() {
                    Some(reply) => reply.await.ok(),
                    None => None,
                };
                match reply {
                    Some(snapshot) => Ok(snapshot.with_records(show_records)),
                    None => self.closed_snapshot(process_id, show_records).await,
                }
            }
        }
    }

    async fn closed_snapshot(&self, process_id: &str, show_records: bool) -> Result<JobSnapshot, ControlError> {
        self.registry
            .wait_closed(process_id)
            .await
            .map(|snapshot| snapshot.with_records(show_records))
            .ok_or_else(|| ControlError::NotFound(process_id.to_string()))
    }

    /// Intermediate dumps are not supported
    pub async fn flush(&self, process_id: &str) -> Result<(), ControlError> {
        let status = match self.entry(process_id)? {
            ManagerEntry::Running { control, .. } => match control.peek(false).await {
                Some(snapshot) => snapshot.status,
                None => JobStatus::Terminated,
            },
            entry => entry.status(),
        };

        if status == JobStatus::Initiated {
            return Err(Self::not_running(process_id));
        }
        if status.is_closing() {
            return Err(ControlError::Unprocessable(format!(
                "Process {} is already {}",
                process_id, status
            )));
        }
        Err(ControlError::NotImplemented("flush".to_string()))
    }

    /// Snapshots of every tracked job
    pub async fn view(&self) -> Result<Vec<JobSnapshot>, ControlError> {
        let entries = self.registry.entries();
        if entries.is_empty() {
            return Err(ControlError::NotFound("no processes".to_string()));
        }

        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            let snapshot = match &entry {
                ManagerEntry::Running { control, snapshot } => match control.peek(false).await {
                    Some(live) => live,
                    None => snapshot.clone().with_records(false),
                },
                other => other.snapshot().clone().with_records(false),
            };
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }

    /// Stops accepting jobs and waits for the workers to exit
    ///
    /// Blocks the calling thread; call after every job is closed.
    pub fn join_workers(&self) {
        self.pool.join();
    }

    /// Stops every running job and waits for all of them to close
    pub async fn shutdown_all(&self) -> Vec<JobSnapshot> {
        let mut pending = Vec::new();
        for entry in self.registry.entries() {
            if let ManagerEntry::Running { control, snapshot } = entry {
                pending.push((snapshot.process_id.clone(), control.request_stop()));
            }
        }
        if !pending.is_empty() {
            tracing::info!("Stopping {} running processes", pending.len());
        }

        let mut closed = Vec::with_capacity(pending.len());
        for (process_id, reply) in pending {
            let snapshot = match reply {
                Some(reply) => reply.await.ok(),
                None => None,
            };
            let snapshot = match snapshot {
                Some(snapshot) => Some(snapshot),
                None => self.registry.wait_closed(&process_id).await,
            };
            closed.extend(snapshot);
        }
        closed
    }
}
