//! Persisted download-job records.
//!
//! A job is created by the surrounding library manager when a user asks for
//! an album. The orchestrator links jobs to acquisition downloads and marks
//! them failed once retries are exhausted.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{CreateJobRequest, JobFilter, JobStore, JobStoreError};
pub use types::{DownloadJob, JobStatus};
