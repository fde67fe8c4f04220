//! Running a job on a worker thread
//!
//! The worker builds a single-threaded runtime and a `LocalSet` for the job,
//! constructs the [`PlayManager`] there and then serves control commands
//! until the job is closed. If the runtime cannot be built the job is
//! marked CORRUPTED in the registry instead.

use crate::control::{JobCommand, JobControl, ManagerRegistry};
use crate::crawler::{JobSettings, PlayManager, ShutdownReason};
use crate::fetch::PlayFetcher;
use crate::state::ProcessKind;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::Instrument;

/// Everything a worker needs to run one job
pub struct JobSpec {
    pub process_id: String,
    pub kind: ProcessKind,
    pub settings: JobSettings,
    pub fetcher: Arc<dyn PlayFetcher>,
    pub logfile: Option<String>,
}

/// Runs a job to completion on the current thread
pub fn run_job(spec: JobSpec, registry: Arc<ManagerRegistry>) {
    let span = tracing::info_span!("job", id = %spec.process_id, kind = %spec.kind);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            span.in_scope(|| tracing::error!("Cannot create execution context: {}", e));
            registry.corrupt(&spec.process_id, e.to_string());
            return;
        }
    };

    let local = LocalSet::new();
    local.block_on(&runtime, drive(spec, registry).instrument(span));
}

/// Starts the job and serves its commands until it is closed
async fn drive(spec: JobSpec, registry: Arc<ManagerRegistry>) {
    let manager = PlayManager::new(
        spec.process_id,
        spec.kind,
        spec.settings,
        spec.fetcher,
        spec.logfile,
    );
    let (sender, mut commands) = mpsc::unbounded_channel();

    manager.start();
    registry.attach(manager.peek(false), JobControl::new(sender));

    let mut stopping = false;
    let mut listening = true;
    loop {
        tokio::select! {
            command = commands.recv(), if listening => match command {
                Some(JobCommand::Peek { show_records, reply }) => {
                    let _ = reply.send(manager.peek(show_records));
                }
                Some(JobCommand::Stop { reply }) => {
                    stopping = true;
                    let manager = manager.clone();
                    tokio::task::spawn_local(async move {
                        let snapshot = manager.shutdown(ShutdownReason::Requested).await;
                        let _ = reply.send(snapshot);
                    });
                }
                None => {
                    listening = false;
                    if !stopping {
                        stopping = true;
                        spawn_shutdown(&manager, ShutdownReason::Requested);
                    }
                }
            },
            _ = manager.idle(), if !stopping => {
                tracing::info!("Job {} ran out of work", manager.id());
                stopping = true;
                spawn_shutdown(&manager, ShutdownReason::Completed);
            }
            snapshot = manager.closed() => {
                registry.close(snapshot);
                break;
            }
        }
    }
}

fn spawn_shutdown(manager: &PlayManager, reason: ShutdownReason) {
    let manager = manager.clone();
    tokio::task::spawn_local(async move {
        manager.shutdown(reason).await;
    });
}
