//! Download signal API handlers.
//!
//! The acquisition side reports download lifecycle events here. Signals are
//! fire-and-forget: they answer 202 whatever the outcome, and the outcome is
//! echoed in the body for operators.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use albumwatch_core::{
    AddDownload, AddOutcome, CompleteOutcome, DownloadOrchestrator, FailOutcome,
    OrchestratorStatus, RefreshReport,
};

use crate::state::AppState;

/// Reason recorded when a failure signal carries no body.
const DEFAULT_FAIL_REASON: &str = "download failed";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a failure signal
#[derive(Debug, Default, Deserialize)]
pub struct FailRequest {
    /// Human-readable failure reason
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response for add/complete signals
#[derive(Debug, Serialize)]
pub struct SignalResponse<T> {
    pub download_id: String,
    pub outcome: T,
}

/// Response for the failure signal
#[derive(Debug, Serialize)]
pub struct FailResponse {
    pub download_id: String,
    #[serde(flatten)]
    pub outcome: FailOutcome,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct DownloadsErrorResponse {
    pub error: String,
}

fn orchestrator_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(DownloadsErrorResponse {
            error: "Download orchestrator is not enabled".to_string(),
        }),
    )
        .into_response()
}

fn orchestrator(state: &AppState) -> Result<&DownloadOrchestrator, Response> {
    state.orchestrator().ok_or_else(orchestrator_unavailable)
}

// ============================================================================
// Handlers
// ============================================================================

/// Get tracked downloads and batch state
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OrchestratorStatus>, Response> {
    let orch = orchestrator(&state)?;
    Ok(Json(orch.status().await))
}

/// Start tracking a download
pub async fn add_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddDownload>,
) -> Result<(StatusCode, Json<SignalResponse<AddOutcome>>), Response> {
    let orch = orchestrator(&state)?;
    let download_id = body.download_id.clone();
    let outcome = orch.add(body).await;
    debug!(download_id = %download_id, ?outcome, "Add signal handled");

    Ok((
        StatusCode::ACCEPTED,
        Json(SignalResponse {
            download_id,
            outcome,
        }),
    ))
}

/// Report a download as completed
pub async fn complete_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SignalResponse<CompleteOutcome>>), Response> {
    let orch = orchestrator(&state)?;
    let outcome = orch.complete(&id).await;
    debug!(download_id = %id, ?outcome, "Complete signal handled");

    Ok((
        StatusCode::ACCEPTED,
        Json(SignalResponse {
            download_id: id,
            outcome,
        }),
    ))
}

/// Report a download as failed
///
/// The body is optional; an empty request uses a generic reason.
pub async fn fail_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<FailRequest>>,
) -> Result<(StatusCode, Json<FailResponse>), Response> {
    let orch = orchestrator(&state)?;
    let reason = body
        .and_then(|Json(req)| req.reason)
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FAIL_REASON.to_string());

    let outcome = orch.fail(&id, &reason).await;
    debug!(download_id = %id, ?outcome, reason = %reason, "Fail signal handled");

    Ok((
        StatusCode::ACCEPTED,
        Json(FailResponse {
            download_id: id,
            outcome,
        }),
    ))
}

/// Run the library refresh now, outside of any batch
pub async fn force_refresh(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshReport>, Response> {
    let orch = orchestrator(&state)?;
    Ok(Json(orch.force_refresh().await))
}
