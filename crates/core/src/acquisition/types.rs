//! Types for acquisition system operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the acquisition system.
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// One item of the acquisition system's download queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Queue item ID (used for removal).
    pub id: i64,
    /// Acquisition system album ID, if the item is linked to one.
    pub album_id: Option<i64>,
    /// Release title as reported by the download client.
    pub title: String,
    /// Raw queue status ("downloading", "completed", "failed", ...).
    pub status: String,
    /// Tracked download health ("ok", "warning", "error").
    pub tracked_download_status: Option<String>,
    /// Tracked download lifecycle ("downloading", "importPending", ...).
    pub tracked_download_state: Option<String>,
    /// Download client reference for this item.
    pub download_id: Option<String>,
    /// Error message reported by the acquisition system.
    pub error_message: Option<String>,
}

impl QueueItem {
    /// Whether the item is flagged warning/error and should be blocklisted.
    pub fn is_problem(&self) -> bool {
        let tracked = self
            .tracked_download_status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("warning") || s.eq_ignore_ascii_case("error"))
            .unwrap_or(false);
        tracked || self.status.eq_ignore_ascii_case("failed")
    }
}

/// An album as known to the acquisition system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionAlbum {
    /// Acquisition system album ID.
    pub id: i64,
    /// Acquisition system artist ID.
    pub artist_id: i64,
    /// Album title.
    pub title: String,
    /// Canonical catalog ID (MusicBrainz release group).
    pub foreign_album_id: String,
    /// Whether the album is being actively acquired.
    pub monitored: bool,
}

/// Trait for acquisition system backends.
#[async_trait]
pub trait AcquisitionClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List the current download queue.
    async fn queue(&self, page_size: u32) -> Result<Vec<QueueItem>, AcquisitionError>;

    /// Remove a queue item, optionally removing it from the download client
    /// and blocklisting its release.
    async fn remove_queue_item(
        &self,
        id: i64,
        remove_from_client: bool,
        blocklist: bool,
    ) -> Result<(), AcquisitionError>;

    /// Issue a new search command for one album.
    async fn search_album(&self, album_id: i64) -> Result<(), AcquisitionError>;

    /// Look up an album by its canonical catalog ID.
    async fn find_album(
        &self,
        foreign_album_id: &str,
    ) -> Result<Option<AcquisitionAlbum>, AcquisitionError>;

    /// List all albums of an artist.
    async fn artist_albums(&self, artist_id: i64)
        -> Result<Vec<AcquisitionAlbum>, AcquisitionError>;

    /// Delete an album (files are kept).
    async fn delete_album(&self, album_id: i64) -> Result<(), AcquisitionError>;

    /// Delete an artist (files are kept).
    async fn delete_artist(&self, artist_id: i64) -> Result<(), AcquisitionError>;
}
