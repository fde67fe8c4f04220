//! Crawl-job orchestration engine
//!
//! This module contains the core of the sweeper, including:
//! - App records and the deduplicated frontier
//! - The per-job task registry (cancellable vs shielded work)
//! - The bounded retry policy around fetch units
//! - Discovery (pagination + similar-app fan-out) and enrichment drivers
//! - The job lifecycle, shutdown protocol and chunked persistence

mod discovery;
mod enrichment;
mod frontier;
mod manager;
mod record;
mod retry;
mod tasks;

pub use frontier::Frontier;
pub use manager::{JobSettings, PlayManager, ShutdownReason};
pub use record::{Record, APP_ID_FIELD};
pub use retry::{retriable, RetryOutcome};
pub use tasks::TaskRegistry;
