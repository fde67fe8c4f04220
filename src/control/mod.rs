//! Job control: registry, worker pool and delegation
//!
//! This module contains:
//! - The shared [`ManagerRegistry`] of job entries
//! - The fixed-size [`WorkerPool`] jobs are delegated to
//! - The per-job driver that runs on a worker thread
//! - The [`Controller`] the API and CLI talk to

mod controller;
mod delegate;
mod error;
mod pool;
mod registry;

pub use controller::{Controller, StartedJob};
pub use delegate::{run_job, JobSpec};
pub use error::ControlError;
pub use pool::WorkerPool;
pub use registry::{JobCommand, JobControl, ManagerEntry, ManagerRegistry};
