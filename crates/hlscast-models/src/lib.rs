//! Shared data models for the HlsCast pipeline.
//!
//! This crate provides:
//! - Job and record identifiers
//! - The record-store collaborator contract

pub mod id;
pub mod record;

pub use id::{JobId, RecordId};
pub use record::{MemoryRecordStore, RecordError, RecordResult, RecordStore};
