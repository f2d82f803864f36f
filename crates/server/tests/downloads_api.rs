//! HTTP tests for the download signal endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use albumwatch_core::{CreateJobRequest, JobStatus, JobStore, SyncQueue};
use common::{fixtures, TestConfig, TestFixture};

fn add_body(download_id: &str, title: &str, album_ref: &str) -> serde_json::Value {
    json!({
        "download_id": download_id,
        "album_title": title,
        "album_ref": album_ref,
        "artist_name": "Massive Attack",
        "context": { "user_id": "user-7", "tier": "deep_cut", "similarity": 0.82 }
    })
}

// =============================================================================
// Health, config and metrics
// =============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["orchestrator"]["enabled"], true);
    assert_eq!(response.body["orchestrator"]["max_attempts"], 3);
    assert!(response.body.get("acquisition").map_or(true, |v| v.is_null()));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/downloads", add_body("dl-m", "Mezzanine", "mb-mezzanine"))
        .await;

    let response = fixture.get("/metrics").await;
    assert_status!(response, StatusCode::OK);

    let text = response.body.as_str().expect("metrics should be text");
    assert!(text.contains("albumwatch_downloads_active 1"));
    assert!(text.contains("albumwatch_batch_deadline_active 1"));
    assert!(text.contains("albumwatch_downloads_tracked_total"));
}

// =============================================================================
// Signals
// =============================================================================

#[tokio::test]
async fn test_add_tracks_download_and_starts_batch() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["download_id"], "dl-1");
    assert_eq!(response.body["outcome"], "tracked");

    let status = fixture.get("/api/v1/downloads").await;
    assert_status!(status, StatusCode::OK);
    assert_eq!(status.body["active_count"], 1);
    assert_eq!(status.body["timeout_active"], true);
    assert_eq!(status.body["batch_epoch"], 1);
    assert_eq!(status.body["entries"][0]["download_id"], "dl-1");
    assert_eq!(status.body["entries"][0]["state"], "active");
}

#[tokio::test]
async fn test_duplicate_add_is_accepted_but_ignored() {
    let fixture = TestFixture::new().await;

    fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;
    let response = fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;

    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["outcome"], "duplicate");
    assert_eq!(fixture.get("/api/v1/downloads").await.body["active_count"], 1);
}

#[tokio::test]
async fn test_add_links_pending_job() {
    let fixture = TestFixture::new().await;
    let job = fixture
        .jobs
        .create(CreateJobRequest {
            user_id: "user-7".to_string(),
            subject: "Mezzanine".to_string(),
            target_album_id: "mb-mezzanine".to_string(),
        })
        .unwrap();

    fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;

    let job = fixture.jobs.get(&job.id).unwrap().unwrap();
    assert_eq!(job.external_ref.as_deref(), Some("dl-1"));
    assert_eq!(job.status, JobStatus::Processing);
}

#[tokio::test]
async fn test_add_rejects_malformed_body() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_raw("/api/v1/downloads", "{not json").await;
    assert!(response.status.is_client_error());

    let response = fixture
        .post("/api/v1/downloads", json!({ "download_id": "dl-1" }))
        .await;
    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn test_complete_settles_batch_and_enqueues_scan() {
    let fixture = TestFixture::new().await;
    fixture.sync_queue.create_user("admin", "admin").unwrap();

    fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;

    let response = fixture.post_empty("/api/v1/downloads/dl-1/complete").await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["outcome"], "completed");

    let status = fixture.get("/api/v1/downloads").await;
    assert_eq!(status.body["active_count"], 0);
    assert_eq!(status.body["timeout_active"], false);
    assert_eq!(status.body["batches_settled"], 1);
    assert_eq!(fixture.sync_queue.list_jobs().unwrap().len(), 1);
}

#[tokio::test]
async fn test_complete_unknown_download_is_accepted() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_empty("/api/v1/downloads/nope/complete").await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["outcome"], "unknown");
    assert_eq!(fixture.sync_queue.list_jobs().unwrap().len(), 0);
}

#[tokio::test]
async fn test_fail_retries_while_attempts_remain() {
    let fixture = TestFixture::new().await;
    fixture
        .acquisition
        .add_album(fixtures::album(10, 1, "mb-mezzanine", true))
        .await;

    fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;

    let response = fixture
        .post("/api/v1/downloads/dl-1/fail", json!({ "reason": "stalled" }))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["download_id"], "dl-1");
    assert_eq!(response.body["outcome"], "retrying");
    assert_eq!(response.body["attempt"], 2);

    let status = fixture.get("/api/v1/downloads").await;
    assert_eq!(status.body["active_count"], 1);
    assert_eq!(status.body["entries"][0]["state"], "retrying");
    assert!(fixture.notified().is_empty());
}

#[tokio::test]
async fn test_fail_exhausts_and_notifies() {
    let fixture = TestFixture::with_config(TestConfig::with_max_attempts(1)).await;
    fixture
        .acquisition
        .add_album(fixtures::album(10, 1, "mb-mezzanine", true))
        .await;

    fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;

    // No body: a generic reason is used
    let response = fixture.post_empty("/api/v1/downloads/dl-1/fail").await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["outcome"], "exhausted");

    let notified = fixture.notified();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].album_ref, "mb-mezzanine");
    assert_eq!(notified[0].user_id.as_deref(), Some("user-7"));
    assert_eq!(notified[0].tier.as_deref(), Some("deep_cut"));
    assert_eq!(notified[0].reason, "download failed");

    assert_eq!(fixture.acquisition.deleted_albums().await, vec![10]);
    assert_eq!(fixture.acquisition.deleted_artists().await, vec![1]);

    let status = fixture.get("/api/v1/downloads").await;
    assert_eq!(status.body["active_count"], 0);
    assert_eq!(status.body["batches_settled"], 1);
}

#[tokio::test]
async fn test_fail_unknown_download_is_accepted() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/downloads/ghost/fail", json!({ "reason": "gone" }))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["outcome"], "unknown");
}

// =============================================================================
// Manual refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_cleans_queue_and_reports() {
    let fixture = TestFixture::new().await;
    fixture.sync_queue.create_user("admin", "admin").unwrap();
    fixture
        .acquisition
        .set_queue(vec![
            fixtures::queue_item(1, Some(10), "ok"),
            fixtures::problem_item(2, Some(11), "warning"),
        ])
        .await;

    let response = fixture.post_empty("/api/v1/downloads/refresh").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["queue_items_seen"], 2);
    assert_eq!(response.body["problem_items"], 1);
    assert_eq!(response.body["blocklisted"], 1);
    assert_eq!(response.body["researched"], 1);
    assert!(response.body["scan_job_id"].is_string());

    assert_eq!(fixture.acquisition.removed_queue_items().await, vec![2]);
    assert_eq!(fixture.acquisition.searched_albums().await, vec![11]);
}

#[tokio::test]
async fn test_refresh_without_users_reports_sync_error() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_empty("/api/v1/downloads/refresh").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.body["scan_job_id"].is_null());
    assert!(response.body["sync_error"].is_string());
}

// =============================================================================
// Orchestrator disabled
// =============================================================================

#[tokio::test]
async fn test_signals_unavailable_without_orchestrator() {
    let fixture = TestFixture::with_config(TestConfig::without_orchestrator()).await;

    let response = fixture.get("/api/v1/downloads").await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.body["error"].is_string());

    let response = fixture
        .post("/api/v1/downloads", add_body("dl-1", "Mezzanine", "mb-mezzanine"))
        .await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);

    let response = fixture.post_empty("/api/v1/downloads/dl-1/complete").await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);

    let response = fixture.post_empty("/api/v1/downloads/refresh").await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);

    // Health still answers
    assert_status!(fixture.get("/api/v1/health").await, StatusCode::OK);
}
