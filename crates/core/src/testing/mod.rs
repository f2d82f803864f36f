//! Testing utilities and mock implementations.
//!
//! This module provides a mock acquisition system plus fixture builders,
//! so the orchestrator can be exercised end to end without a real Lidarr.
//! Persistence needs no mock: use `SqliteJobStore::in_memory()` and
//! `SqliteSyncQueue::in_memory()`.
//!
//! # Example
//!
//! ```rust,ignore
//! use albumwatch_core::testing::{fixtures, MockAcquisitionClient};
//!
//! let acquisition = MockAcquisitionClient::new();
//! acquisition.add_album(fixtures::album(10, 1, "mb-ok-computer", true)).await;
//! acquisition.set_queue(vec![fixtures::problem_item(1, Some(10), "warning")]).await;
//! ```

mod mock_acquisition;

pub use mock_acquisition::{AcquisitionCall, MockAcquisitionClient};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::acquisition::{AcquisitionAlbum, QueueItem};
    use crate::orchestrator::{AddDownload, DownloadContext};

    /// Create an album known to the acquisition system.
    pub fn album(id: i64, artist_id: i64, foreign_album_id: &str, monitored: bool) -> AcquisitionAlbum {
        AcquisitionAlbum {
            id,
            artist_id,
            title: format!("Album {}", id),
            foreign_album_id: foreign_album_id.to_string(),
            monitored,
        }
    }

    /// Create a queue item with the given tracked download status.
    pub fn queue_item(id: i64, album_id: Option<i64>, tracked_status: &str) -> QueueItem {
        QueueItem {
            id,
            album_id,
            title: format!("Release {}", id),
            status: "downloading".to_string(),
            tracked_download_status: Some(tracked_status.to_string()),
            tracked_download_state: Some("downloading".to_string()),
            download_id: Some(format!("client-{}", id)),
            error_message: None,
        }
    }

    /// Create a queue item flagged warning/error.
    pub fn problem_item(id: i64, album_id: Option<i64>, tracked_status: &str) -> QueueItem {
        QueueItem {
            error_message: Some("No files found are eligible for import".to_string()),
            tracked_download_state: Some("importPending".to_string()),
            ..queue_item(id, album_id, tracked_status)
        }
    }

    /// Create an add request with no local references.
    pub fn add_download(download_id: &str, album_title: &str, album_ref: &str) -> AddDownload {
        AddDownload {
            download_id: download_id.to_string(),
            album_title: album_title.to_string(),
            album_ref: album_ref.to_string(),
            artist_name: "Test Artist".to_string(),
            artist_ref: Some("mb-test-artist".to_string()),
            album_id: None,
            artist_id: None,
            context: DownloadContext::default(),
        }
    }

    /// Create an add request that already carries acquisition IDs.
    pub fn add_download_with_ids(
        download_id: &str,
        album_title: &str,
        album_ref: &str,
        album_id: i64,
        artist_id: i64,
    ) -> AddDownload {
        AddDownload {
            album_id: Some(album_id),
            artist_id: Some(artist_id),
            ..add_download(download_id, album_title, album_ref)
        }
    }
}
