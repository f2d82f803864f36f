//! Lidarr acquisition client implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AcquisitionConfig;
use crate::metrics;

use super::{AcquisitionAlbum, AcquisitionClient, AcquisitionError, QueueItem};

const SERVICE: &str = "lidarr";

/// Lidarr REST API (v1) client.
pub struct LidarrClient {
    client: Client,
    config: AcquisitionConfig,
}

impl LidarrClient {
    /// Create a new Lidarr client.
    pub fn new(config: AcquisitionConfig) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| AcquisitionError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url(), endpoint);
        self.client
            .request(method, url)
            .header("X-Api-Key", &self.config.api_key)
    }

    /// Send a request, mapping transport and status failures.
    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Response, AcquisitionError> {
        let start = Instant::now();
        let result = Self::send_inner(request).await;

        metrics::EXTERNAL_SERVICE_DURATION
            .with_label_values(&[SERVICE, operation])
            .observe(start.elapsed().as_secs_f64());
        metrics::EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                SERVICE,
                operation,
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        result
    }

    async fn send_inner(request: RequestBuilder) -> Result<Response, AcquisitionError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AcquisitionError::Timeout
            } else if e.is_connect() {
                AcquisitionError::ConnectionFailed(e.to_string())
            } else {
                AcquisitionError::Api {
                    status: 0,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.as_u16() == 404 {
            let url = response.url().path().to_string();
            return Err(AcquisitionError::NotFound(url));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AcquisitionError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, AcquisitionError> {
        response
            .json()
            .await
            .map_err(|e| AcquisitionError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl AcquisitionClient for LidarrClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn queue(&self, page_size: u32) -> Result<Vec<QueueItem>, AcquisitionError> {
        let endpoint = format!(
            "/api/v1/queue?page=1&pageSize={}&includeAlbum=true",
            page_size
        );
        let response = self
            .send("queue", self.request(Method::GET, &endpoint))
            .await?;
        let page: QueuePage = Self::json(response).await?;

        debug!(records = page.records.len(), "Fetched acquisition queue");
        Ok(page.records.into_iter().map(QueueItem::from).collect())
    }

    async fn remove_queue_item(
        &self,
        id: i64,
        remove_from_client: bool,
        blocklist: bool,
    ) -> Result<(), AcquisitionError> {
        let endpoint = format!(
            "/api/v1/queue/{}?removeFromClient={}&blocklist={}",
            id, remove_from_client, blocklist
        );
        self.send("remove_queue_item", self.request(Method::DELETE, &endpoint))
            .await?;
        Ok(())
    }

    async fn search_album(&self, album_id: i64) -> Result<(), AcquisitionError> {
        let command = SearchCommand {
            name: "AlbumSearch",
            album_ids: vec![album_id],
        };
        self.send(
            "search_album",
            self.request(Method::POST, "/api/v1/command").json(&command),
        )
        .await?;
        Ok(())
    }

    async fn find_album(
        &self,
        foreign_album_id: &str,
    ) -> Result<Option<AcquisitionAlbum>, AcquisitionError> {
        let endpoint = format!(
            "/api/v1/album?foreignAlbumId={}",
            urlencoding::encode(foreign_album_id)
        );
        let response = self
            .send("find_album", self.request(Method::GET, &endpoint))
            .await?;
        let albums: Vec<LidarrAlbum> = Self::json(response).await?;
        Ok(albums.into_iter().next().map(AcquisitionAlbum::from))
    }

    async fn artist_albums(
        &self,
        artist_id: i64,
    ) -> Result<Vec<AcquisitionAlbum>, AcquisitionError> {
        let endpoint = format!("/api/v1/album?artistId={}", artist_id);
        let response = self
            .send("artist_albums", self.request(Method::GET, &endpoint))
            .await?;
        let albums: Vec<LidarrAlbum> = Self::json(response).await?;
        Ok(albums.into_iter().map(AcquisitionAlbum::from).collect())
    }

    async fn delete_album(&self, album_id: i64) -> Result<(), AcquisitionError> {
        let endpoint = format!("/api/v1/album/{}?deleteFiles=false", album_id);
        self.send("delete_album", self.request(Method::DELETE, &endpoint))
            .await?;
        Ok(())
    }

    async fn delete_artist(&self, artist_id: i64) -> Result<(), AcquisitionError> {
        let endpoint = format!("/api/v1/artist/{}?deleteFiles=false", artist_id);
        self.send("delete_artist", self.request(Method::DELETE, &endpoint))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Lidarr API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuePage {
    #[serde(default)]
    records: Vec<LidarrQueueRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LidarrQueueRecord {
    id: i64,
    album_id: Option<i64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: String,
    tracked_download_status: Option<String>,
    tracked_download_state: Option<String>,
    download_id: Option<String>,
    error_message: Option<String>,
}

impl From<LidarrQueueRecord> for QueueItem {
    fn from(r: LidarrQueueRecord) -> Self {
        QueueItem {
            id: r.id,
            album_id: r.album_id,
            title: r.title,
            status: r.status,
            tracked_download_status: r.tracked_download_status,
            tracked_download_state: r.tracked_download_state,
            download_id: r.download_id,
            error_message: r.error_message,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LidarrAlbum {
    id: i64,
    artist_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    foreign_album_id: String,
    #[serde(default)]
    monitored: bool,
}

impl From<LidarrAlbum> for AcquisitionAlbum {
    fn from(a: LidarrAlbum) -> Self {
        AcquisitionAlbum {
            id: a.id,
            artist_id: a.artist_id,
            title: a.title,
            foreign_album_id: a.foreign_album_id,
            monitored: a.monitored,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchCommand {
    name: &'static str,
    album_ids: Vec<i64>,
}
