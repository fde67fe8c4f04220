//! Per-job task registry
//!
//! Every asynchronous unit of work a job spawns is tracked here, in one of
//! two disjoint sets:
//!
//! - *cancellable* tasks are aborted as soon as shutdown begins
//! - *shielded* tasks are left alone and awaited until none remain
//!
//! The registry lives on the job's single-threaded context and is shared
//! through `Rc`; no borrow is ever held across an `.await`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Lifecycle of the registry itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accepts both kinds of work
    Open,
    /// Cancellable work refused, shielded work still accepted
    Closing,
    /// Shielded work drained; nothing accepted anymore
    Sealed,
}

#[derive(Default)]
struct TaskSets {
    next_id: u64,
    cancellable: HashMap<u64, JoinHandle<()>>,
    shielded: HashMap<u64, JoinHandle<()>>,
}

impl TaskSets {
    fn is_empty(&self) -> bool {
        self.cancellable.is_empty() && self.shielded.is_empty()
    }
}

pub struct TaskRegistry {
    sets: RefCell<TaskSets>,
    phase: Cell<Phase>,
    idle: Notify,
}

/// Removes its task from the registry when the task's future is dropped
///
/// Created before the task is spawned and moved into it, so the entry goes
/// away whether the task finishes, is aborted, or is never polled at all.
struct TaskGuard {
    registry: Rc<TaskRegistry>,
    id: u64,
    shield: bool,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.registry.forget(self.id, self.shield);
    }
}

impl TaskRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            sets: RefCell::new(TaskSets::default()),
            phase: Cell::new(Phase::Open),
            idle: Notify::new(),
        })
    }

    /// Spawns `fut` on the current `LocalSet` and tracks it
    ///
    /// The task runs inside the caller's tracing span. Returns false,
    /// without spawning, when the registry no longer accepts that kind of
    /// work.
    pub fn schedule<F>(self: &Rc<Self>, fut: F, shield: bool) -> bool
    where
        F: Future<Output = ()> + 'static,
    {
        let accepted = match self.phase.get() {
            Phase::Open => true,
            Phase::Closing => shield,
            Phase::Sealed => false,
        };
        if !accepted {
            return false;
        }

        let id = {
            let mut sets = self.sets.borrow_mut();
            sets.next_id += 1;
            sets.next_id
        };
        let guard = TaskGuard {
            registry: Rc::clone(self),
            id,
            shield,
        };

        let handle = tokio::task::spawn_local(
            async move {
                let _guard = guard;
                fut.await;
            }
            .in_current_span(),
        );

        let mut sets = self.sets.borrow_mut();
        if shield {
            sets.shielded.insert(id, handle);
        } else {
            sets.cancellable.insert(id, handle);
        }
        true
    }

    fn forget(&self, id: u64, shield: bool) {
        let now_empty = {
            let mut sets = self.sets.borrow_mut();
            if shield {
                sets.shielded.remove(&id);
            } else {
                sets.cancellable.remove(&id);
            }
            sets.is_empty()
        };
        if now_empty {
            self.idle.notify_one();
        }
    }

    /// True when shutdown has begun
    pub fn is_closing(&self) -> bool {
        self.phase.get() != Phase::Open
    }

    pub fn is_empty(&self) -> bool {
        self.sets.borrow().is_empty()
    }

    /// Number of in-flight (cancellable, shielded) tasks
    pub fn counts(&self) -> (usize, usize) {
        let sets = self.sets.borrow();
        (sets.cancellable.len(), sets.shielded.len())
    }

    /// Resolves once no task is in flight
    pub async fn wait_idle(&self) {
        loop {
            if self.is_empty() {
                return;
            }
            self.idle.notified().await;
        }
    }

    /// Refuses new cancellable work and aborts every cancellable task
    ///
    /// Returns how many tasks were aborted.
    pub fn cancel_all(&self) -> usize {
        if self.phase.get() == Phase::Open {
            self.phase.set(Phase::Closing);
        }

        let cancellable = std::mem::take(&mut self.sets.borrow_mut().cancellable);
        let count = cancellable.len();
        for (id, handle) in cancellable {
            handle.abort();
            tracing::debug!("Cancelled task {}", id);
        }
        count
    }

    /// Awaits every shielded task, including ones spawned while draining,
    /// then seals the registry
    pub async fn drain_shielded(&self) -> usize {
        let mut drained = 0;
        loop {
            let batch = std::mem::take(&mut self.sets.borrow_mut().shielded);
            if batch.is_empty() {
                break;
            }
            for (id, handle) in batch {
                if let Err(e) = handle.await {
                    tracing::warn!("Shielded task {} did not finish cleanly: {}", id, e);
                }
                drained += 1;
            }
        }
        self.phase.set(Phase::Sealed);
        drained
    }
}
