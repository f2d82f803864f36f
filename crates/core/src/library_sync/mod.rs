//! Downstream library synchronization queue.
//!
//! The orchestrator never scans the library itself. When a batch settles it
//! enqueues one `library_scan` job here, attributed to a resolved owner.

mod sqlite;

pub use sqlite::SqliteSyncQueue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Job kind for a full library rescan.
pub const LIBRARY_SCAN: &str = "library_scan";

/// Error type for sync queue operations.
#[derive(Debug, Error)]
pub enum SyncQueueError {
    #[error("Database error: {0}")]
    Database(String),
}

/// A user that sync jobs can be attributed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOwner {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// A queued sync job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: String,
    pub owner_id: String,
    pub kind: String,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Trait for the downstream job queue.
pub trait SyncQueue: Send + Sync {
    /// Resolve the owner to attribute sync jobs to.
    ///
    /// Prefers the oldest admin, then the oldest user of any role.
    fn resolve_owner(&self) -> Result<Option<SyncOwner>, SyncQueueError>;

    /// Enqueue one library scan job and return its ID.
    fn enqueue_library_scan(&self, owner_id: &str, reason: &str)
        -> Result<String, SyncQueueError>;

    /// List queued jobs, oldest first.
    fn list_jobs(&self) -> Result<Vec<SyncJob>, SyncQueueError>;
}
