//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the albumwatch server:
//! - HTTP request metrics (latency, counts)
//! - Orchestrator status (collected dynamically)
//! - Core download/batch metrics (registered from `albumwatch_core::metrics`)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "albumwatch_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("albumwatch_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "albumwatch_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Orchestrator running state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "albumwatch_orchestrator_running",
        "Whether the orchestrator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Downloads currently tracked.
pub static DOWNLOADS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "albumwatch_downloads_active",
        "Number of downloads currently tracked",
    )
    .unwrap()
});

/// Whether a batch deadline is pending.
pub static BATCH_DEADLINE_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "albumwatch_batch_deadline_active",
        "Whether a batch deadline is pending (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Orchestrator
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(DOWNLOADS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(BATCH_DEADLINE_ACTIVE.clone()))
        .unwrap();

    // Core metrics (downloads, batches, external services)
    for metric in albumwatch_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the orchestrator right now.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.orchestrator() {
        Some(orchestrator) => {
            let status = orchestrator.status().await;
            ORCHESTRATOR_RUNNING.set(if status.running { 1 } else { 0 });
            DOWNLOADS_ACTIVE.set(status.active_count as i64);
            BATCH_DEADLINE_ACTIVE.set(if status.timeout_active { 1 } else { 0 });
        }
        None => {
            ORCHESTRATOR_RUNNING.set(0);
            DOWNLOADS_ACTIVE.set(0);
            BATCH_DEADLINE_ACTIVE.set(0);
        }
    }
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").unwrap());
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());
// Download IDs are opaque strings chosen by the acquisition system
static DOWNLOAD_SIGNAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/downloads/[^/]+/(complete|fail)$").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = DOWNLOAD_SIGNAL_RE.replace_all(path, "/downloads/{id}/$1");
    let result = UUID_RE.replace_all(&result, "{id}");
    let result = HASH_RE.replace_all(&result, "{hash}");
    let result = NUMERIC_RE.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/jobs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/jobs/{id}");
    }

    #[test]
    fn test_normalize_path_hash() {
        let path = "/api/v1/queue/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        assert_eq!(normalize_path(path), "/api/v1/queue/{hash}");
    }

    #[test]
    fn test_normalize_path_download_signal() {
        assert_eq!(
            normalize_path("/api/v1/downloads/SABnzbd_nzo_x1y2z3/complete"),
            "/api/v1/downloads/{id}/complete"
        );
        assert_eq!(
            normalize_path("/api/v1/downloads/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3/fail"),
            "/api/v1/downloads/{id}/fail"
        );
        assert_eq!(
            normalize_path("/api/v1/downloads/refresh"),
            "/api/v1/downloads/refresh"
        );
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/albums/12345/tracks/2";
        assert_eq!(normalize_path(path), "/api/v1/albums/{id}/tracks/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("albumwatch_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        albumwatch_core::metrics::BATCHES_SETTLED.inc_by(0);
        DOWNLOADS_ACTIVE.set(0);

        let output = encode_metrics();
        assert!(output.contains("albumwatch_batches_settled_total"));
        assert!(output.contains("albumwatch_downloads_active"));
    }
}
