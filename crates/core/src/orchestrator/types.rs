//! Types for the download completion orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during orchestration.
///
/// None of these ever reach the caller of `add`/`complete`/`fail`; they are
/// logged where they are swallowed.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Signal referenced a download that is not tracked.
    #[error("download not tracked: {0}")]
    UnknownEntry(String),

    /// No user exists to attribute the library sync job to.
    #[error("no user available to own the library sync job")]
    NoActor,

    /// Acquisition system error.
    #[error("acquisition error: {0}")]
    Acquisition(#[from] crate::acquisition::AcquisitionError),

    /// Job store error.
    #[error("job store error: {0}")]
    JobStore(#[from] crate::jobs::JobStoreError),

    /// Sync queue error.
    #[error("sync queue error: {0}")]
    SyncQueue(#[from] crate::library_sync::SyncQueueError),
}

/// Optional request context, carried through to failure notifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadContext {
    /// User who requested the album.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Recommendation tier the album came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Similarity score of the recommendation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// Request to start tracking a download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDownload {
    /// Acquisition download ID (unique key).
    pub download_id: String,
    pub album_title: String,
    /// Canonical catalog ID of the album.
    pub album_ref: String,
    pub artist_name: String,
    /// Canonical catalog ID of the artist.
    #[serde(default)]
    pub artist_ref: Option<String>,
    /// Acquisition system album ID, when already known.
    #[serde(default)]
    pub album_id: Option<i64>,
    /// Acquisition system artist ID, when already known.
    #[serde(default)]
    pub artist_id: Option<i64>,
    #[serde(default)]
    pub context: DownloadContext,
}

/// Retry state of a tracked download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// First attempt in progress.
    Active,
    /// A failure was reported and a new search was issued.
    Retrying,
    /// Attempts are used up; cleanup is running.
    Exhausted,
}

/// A download being tracked by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub download_id: String,
    pub album_title: String,
    pub album_ref: String,
    pub artist_name: String,
    pub artist_ref: Option<String>,
    pub album_id: Option<i64>,
    pub artist_id: Option<i64>,
    /// Attempt counter, starting at 1.
    pub attempts: u32,
    pub state: EntryState,
    pub started_at: DateTime<Utc>,
    /// Most recent failure reason.
    pub last_error: Option<String>,
    pub context: DownloadContext,
}

impl DownloadEntry {
    /// Build a fresh entry on its first attempt.
    pub fn new(request: AddDownload, started_at: DateTime<Utc>) -> Self {
        Self {
            download_id: request.download_id,
            album_title: request.album_title,
            album_ref: request.album_ref,
            artist_name: request.artist_name,
            artist_ref: request.artist_ref,
            album_id: request.album_id,
            artist_id: request.artist_id,
            attempts: 1,
            state: EntryState::Active,
            started_at,
            last_error: None,
            context: request.context,
        }
    }
}

/// Payload handed to unavailable-album subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableAlbum {
    pub album_title: String,
    pub artist_name: String,
    pub album_ref: String,
    pub artist_ref: Option<String>,
    pub user_id: Option<String>,
    pub tier: Option<String>,
    pub similarity: Option<f64>,
    /// Failure that exhausted the last attempt.
    pub reason: String,
}

impl UnavailableAlbum {
    pub fn from_entry(entry: &DownloadEntry, reason: &str) -> Self {
        Self {
            album_title: entry.album_title.clone(),
            artist_name: entry.artist_name.clone(),
            album_ref: entry.album_ref.clone(),
            artist_ref: entry.artist_ref.clone(),
            user_id: entry.context.user_id.clone(),
            tier: entry.context.tier.clone(),
            similarity: entry.context.similarity,
            reason: reason.to_string(),
        }
    }
}

/// Result of an `add` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Tracked,
    Duplicate,
}

/// Result of a `complete` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompleteOutcome {
    Completed,
    Unknown,
}

/// Result of a `fail` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum FailOutcome {
    /// A new search was issued; `attempt` is the attempt now in progress.
    Retrying { attempt: u32 },
    /// Attempts used up; cleanup ran and the entry was removed.
    Exhausted,
    /// The download was already being cleaned up.
    AlreadyExhausting,
    Unknown,
}

/// Summary of one library refresh run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Queue items listed from the acquisition system.
    pub queue_items_seen: usize,
    /// Items flagged warning/error.
    pub problem_items: usize,
    /// Items removed with blocklist.
    pub blocklisted: usize,
    /// Albums for which a new search was issued.
    pub researched: usize,
    /// Items where removal or search failed.
    pub failed_items: usize,
    /// ID of the enqueued library scan job.
    pub scan_job_id: Option<String>,
    /// Why the scan job was not enqueued, if it wasn't.
    pub sync_error: Option<String>,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the stale sweep is running.
    pub running: bool,
    /// Number of downloads being tracked.
    pub active_count: usize,
    /// Tracked downloads.
    pub entries: Vec<DownloadEntry>,
    /// Whether a batch deadline is pending.
    pub timeout_active: bool,
    /// Epoch of the current (or most recent) batch.
    pub batch_epoch: u64,
    /// Batches that have settled since startup.
    pub batches_settled: u64,
    /// Registered unavailable-album subscribers.
    pub callbacks_registered: usize,
}
