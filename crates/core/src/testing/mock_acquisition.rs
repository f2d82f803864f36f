//! Mock acquisition client for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::acquisition::{AcquisitionAlbum, AcquisitionClient, AcquisitionError, QueueItem};

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionCall {
    Queue {
        page_size: u32,
    },
    RemoveQueueItem {
        id: i64,
        remove_from_client: bool,
        blocklist: bool,
    },
    SearchAlbum(i64),
    FindAlbum(String),
    ArtistAlbums(i64),
    DeleteAlbum(i64),
    DeleteArtist(i64),
}

/// Mock implementation of the AcquisitionClient trait.
///
/// Provides controllable behavior for testing:
/// - Configurable queue and album catalog
/// - Every call recorded for assertions
/// - Injectable failures per operation (optionally per ID)
///
/// # Example
///
/// ```rust,ignore
/// use albumwatch_core::testing::{MockAcquisitionClient, fixtures};
///
/// let client = MockAcquisitionClient::new();
/// client.add_album(fixtures::album(10, 1, "mb-ok", true)).await;
/// client.fail("delete_artist", AcquisitionError::Timeout).await;
///
/// // ... drive the orchestrator ...
///
/// assert_eq!(client.deleted_albums().await, vec![10]);
/// ```
pub struct MockAcquisitionClient {
    /// Queue returned by `queue()`.
    queue: Arc<RwLock<Vec<QueueItem>>>,
    /// Albums known to the acquisition system.
    albums: Arc<RwLock<Vec<AcquisitionAlbum>>>,
    /// Recorded calls, in order.
    calls: Arc<RwLock<Vec<AcquisitionCall>>>,
    /// Injected failures keyed by "operation" or "operation:id".
    failures: Arc<RwLock<HashMap<String, AcquisitionError>>>,
}

impl std::fmt::Debug for MockAcquisitionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAcquisitionClient")
            .field("queue", &"<queue>")
            .field("albums", &"<albums>")
            .field("calls", &"<calls>")
            .field("failures", &"<failures>")
            .finish()
    }
}

impl Default for MockAcquisitionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAcquisitionClient {
    /// Create a new mock with an empty queue and catalog.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(RwLock::new(Vec::new())),
            albums: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Set the queue returned by subsequent `queue()` calls.
    pub async fn set_queue(&self, items: Vec<QueueItem>) {
        *self.queue.write().await = items;
    }

    /// Add an album to the catalog.
    pub async fn add_album(&self, album: AcquisitionAlbum) {
        self.albums.write().await.push(album);
    }

    /// Current catalog contents.
    pub async fn albums(&self) -> Vec<AcquisitionAlbum> {
        self.albums.read().await.clone()
    }

    /// Make every call of `operation` fail.
    ///
    /// Operations are named after the trait methods (`"search_album"`,
    /// `"delete_album"`, ...).
    pub async fn fail(&self, operation: &str, error: AcquisitionError) {
        self.failures
            .write()
            .await
            .insert(operation.to_string(), error);
    }

    /// Make `queue()` fail.
    pub async fn set_queue_error(&self, error: AcquisitionError) {
        self.fail("queue", error).await;
    }

    /// Make removal of one queue item fail.
    pub async fn fail_remove_queue_item(&self, id: i64, error: AcquisitionError) {
        self.failures
            .write()
            .await
            .insert(format!("remove_queue_item:{}", id), error);
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<AcquisitionCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Album IDs passed to `search_album`, in call order.
    pub async fn searched_albums(&self) -> Vec<i64> {
        self.collect(|call| match call {
            AcquisitionCall::SearchAlbum(id) => Some(*id),
            _ => None,
        })
        .await
    }

    /// Queue item IDs passed to `remove_queue_item`, in call order.
    pub async fn removed_queue_items(&self) -> Vec<i64> {
        self.collect(|call| match call {
            AcquisitionCall::RemoveQueueItem { id, .. } => Some(*id),
            _ => None,
        })
        .await
    }

    /// Album IDs passed to `delete_album`, in call order.
    pub async fn deleted_albums(&self) -> Vec<i64> {
        self.collect(|call| match call {
            AcquisitionCall::DeleteAlbum(id) => Some(*id),
            _ => None,
        })
        .await
    }

    /// Artist IDs passed to `delete_artist`, in call order.
    pub async fn deleted_artists(&self) -> Vec<i64> {
        self.collect(|call| match call {
            AcquisitionCall::DeleteArtist(id) => Some(*id),
            _ => None,
        })
        .await
    }

    async fn collect<F>(&self, f: F) -> Vec<i64>
    where
        F: Fn(&AcquisitionCall) -> Option<i64>,
    {
        self.calls.read().await.iter().filter_map(f).collect()
    }

    async fn record(&self, call: AcquisitionCall) {
        self.calls.write().await.push(call);
    }

    /// Injected failure for an operation, checking the ID-specific key first.
    async fn injected(&self, operation: &str, id: Option<i64>) -> Result<(), AcquisitionError> {
        let failures = self.failures.read().await;
        if let Some(id) = id {
            if let Some(err) = failures.get(&format!("{}:{}", operation, id)) {
                return Err(err.clone());
            }
        }
        match failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AcquisitionClient for MockAcquisitionClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn queue(&self, page_size: u32) -> Result<Vec<QueueItem>, AcquisitionError> {
        self.record(AcquisitionCall::Queue { page_size }).await;
        self.injected("queue", None).await?;

        let queue = self.queue.read().await;
        Ok(queue.iter().take(page_size as usize).cloned().collect())
    }

    async fn remove_queue_item(
        &self,
        id: i64,
        remove_from_client: bool,
        blocklist: bool,
    ) -> Result<(), AcquisitionError> {
        self.record(AcquisitionCall::RemoveQueueItem {
            id,
            remove_from_client,
            blocklist,
        })
        .await;
        self.injected("remove_queue_item", Some(id)).await?;

        let mut queue = self.queue.write().await;
        let before = queue.len();
        queue.retain(|item| item.id != id);
        if queue.len() == before {
            return Err(AcquisitionError::NotFound(format!("queue item {}", id)));
        }
        Ok(())
    }

    async fn search_album(&self, album_id: i64) -> Result<(), AcquisitionError> {
        self.record(AcquisitionCall::SearchAlbum(album_id)).await;
        self.injected("search_album", Some(album_id)).await
    }

    async fn find_album(
        &self,
        foreign_album_id: &str,
    ) -> Result<Option<AcquisitionAlbum>, AcquisitionError> {
        self.record(AcquisitionCall::FindAlbum(foreign_album_id.to_string()))
            .await;
        self.injected("find_album", None).await?;

        Ok(self
            .albums
            .read()
            .await
            .iter()
            .find(|a| a.foreign_album_id == foreign_album_id)
            .cloned())
    }

    async fn artist_albums(
        &self,
        artist_id: i64,
    ) -> Result<Vec<AcquisitionAlbum>, AcquisitionError> {
        self.record(AcquisitionCall::ArtistAlbums(artist_id)).await;
        self.injected("artist_albums", Some(artist_id)).await?;

        Ok(self
            .albums
            .read()
            .await
            .iter()
            .filter(|a| a.artist_id == artist_id)
            .cloned()
            .collect())
    }

    async fn delete_album(&self, album_id: i64) -> Result<(), AcquisitionError> {
        self.record(AcquisitionCall::DeleteAlbum(album_id)).await;
        self.injected("delete_album", Some(album_id)).await?;

        self.albums.write().await.retain(|a| a.id != album_id);
        Ok(())
    }

    async fn delete_artist(&self, artist_id: i64) -> Result<(), AcquisitionError> {
        self.record(AcquisitionCall::DeleteArtist(artist_id)).await;
        self.injected("delete_artist", Some(artist_id)).await?;

        self.albums.write().await.retain(|a| a.artist_id != artist_id);
        Ok(())
    }
}
