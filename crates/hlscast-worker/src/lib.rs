//! HLS conversion polling worker.
//!
//! This crate provides:
//! - The conversion-poll job logic
//! - A job executor with bounded concurrency and graceful shutdown
//! - A Redis-backed record field store
//! - The media registry that starts conversion chains

pub mod config;
pub mod convert;
pub mod error;
pub mod executor;
pub mod records;
pub mod registry;

pub use config::WorkerConfig;
pub use convert::{run_convert_job, ConvertContext, PollOutcome};
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use records::RedisRecordStore;
pub use registry::MediaRegistry;
