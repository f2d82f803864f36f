//! Job storage trait and types.

use thiserror::Error;

use super::{DownloadJob, JobStatus};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// Job not found.
    #[error("Job not found: {0}")]
    NotFound(String),
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new job.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub user_id: String,
    pub subject: String,
    pub target_album_id: String,
}

/// Filter for querying jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub target_album_id: Option<String>,
    pub limit: i64,
}

impl JobFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            target_album_id: None,
            limit: 100,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_target_album(mut self, album_id: impl Into<String>) -> Self {
        self.target_album_id = Some(album_id.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// Trait for job storage backends.
pub trait JobStore: Send + Sync {
    /// Create a new pending job.
    fn create(&self, request: CreateJobRequest) -> Result<DownloadJob, JobStoreError>;

    /// Get a job by ID.
    fn get(&self, id: &str) -> Result<Option<DownloadJob>, JobStoreError>;

    /// List jobs matching the filter.
    fn list(&self, filter: &JobFilter) -> Result<Vec<DownloadJob>, JobStoreError>;

    /// Claim every unlinked pending/processing job for `target_album_id`,
    /// setting its external reference and moving it to processing.
    ///
    /// The filter and the mutation happen in one conditional update, so a job
    /// can only ever be claimed by one external reference. Returns the number
    /// of jobs claimed.
    fn link_external_ref(
        &self,
        target_album_id: &str,
        external_ref: &str,
    ) -> Result<usize, JobStoreError>;

    /// Mark every non-completed job with this subject as failed.
    /// Returns the number of jobs updated.
    fn mark_failed_by_subject(&self, subject: &str, reason: &str)
        -> Result<usize, JobStoreError>;
}
