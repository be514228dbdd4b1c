//! Redis-backed delayed job queue.
//!
//! This crate provides:
//! - The conversion-poll job type
//! - A sorted-set queue with delayed re-enqueue
//! - The `JobScheduler` seam the poller reschedules through

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::ConvertStreamJob;
pub use queue::{JobQueue, JobScheduler, QueueConfig};
