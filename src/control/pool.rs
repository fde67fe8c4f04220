//! Fixed-size pool of named worker threads
//!
//! Each worker runs one job at a time to completion. Jobs build their own
//! single-threaded runtime, so the workers themselves are plain threads.

use crate::control::ControlError;
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

type WorkItem = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Mutex<Option<Sender<WorkItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawns `size` workers named `<prefix>-<n>`
    pub fn new(size: usize, prefix: &str) -> io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<WorkItem>();

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", prefix, index))
                .spawn(move || worker_loop(receiver))?;
            workers.push(handle);
        }

        tracing::debug!("Started {} worker threads", size);
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queues `work` for the next idle worker
    pub fn execute<F>(&self, work: F) -> Result<(), ControlError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender
                .send(Box::new(work))
                .map_err(|_| ControlError::Unavailable("all workers have exited".to_string())),
            None => Err(ControlError::Unavailable("pool is shut down".to_string())),
        }
    }

    /// Stops accepting work and waits for queued work to finish
    pub fn join(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                tracing::error!("Worker {} panicked", name);
            }
        }
    }
}

/// Runs queued work until every sender is gone and the queue is empty
fn worker_loop(receiver: Receiver<WorkItem>) {
    for work in receiver.iter() {
        work();
    }
}
