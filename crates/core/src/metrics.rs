//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Download tracking (added, completed, retried, exhausted, swept)
//! - Batch lifecycle (started, settled, library refreshes)
//! - External services (acquisition system)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Download Tracking Metrics
// =============================================================================

/// Downloads registered for tracking.
pub static DOWNLOADS_TRACKED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "albumwatch_downloads_tracked_total",
        "Total downloads registered for tracking",
    )
    .unwrap()
});

/// Downloads that completed successfully.
pub static DOWNLOADS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "albumwatch_downloads_completed_total",
        "Total tracked downloads that completed",
    )
    .unwrap()
});

/// Download failures by outcome.
pub static DOWNLOAD_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "albumwatch_download_failures_total",
            "Total failure signals handled",
        ),
        &["outcome"], // "retrying", "exhausted"
    )
    .unwrap()
});

/// Failures forced by the batch deadline.
pub static TIMEOUT_FORCED_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "albumwatch_timeout_forced_failures_total",
        "Total entries force-failed by the batch deadline",
    )
    .unwrap()
});

/// Entries removed by the stale sweep.
pub static STALE_ENTRIES_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "albumwatch_stale_entries_swept_total",
        "Total entries removed by the stale sweep",
    )
    .unwrap()
});

/// Unavailable-album callbacks that returned an error.
pub static CALLBACK_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "albumwatch_callback_failures_total",
        "Total unavailable-album callbacks that failed",
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics
// =============================================================================

/// Batches started (empty -> nonempty transitions).
pub static BATCHES_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("albumwatch_batches_started_total", "Total batches started").unwrap()
});

/// Batches settled (nonempty -> empty transitions).
pub static BATCHES_SETTLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("albumwatch_batches_settled_total", "Total batches settled").unwrap()
});

/// Library refresh runs by outcome.
pub static REFRESH_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("albumwatch_refresh_runs_total", "Total library refresh runs"),
        &["outcome"], // "enqueued", "no_actor", "error"
    )
    .unwrap()
});

/// Queue items removed with blocklist during refresh.
pub static QUEUE_ITEMS_BLOCKLISTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "albumwatch_queue_items_blocklisted_total",
        "Total problem queue items removed and blocklisted",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "albumwatch_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "albumwatch_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Downloads
        Box::new(DOWNLOADS_TRACKED.clone()),
        Box::new(DOWNLOADS_COMPLETED.clone()),
        Box::new(DOWNLOAD_FAILURES.clone()),
        Box::new(TIMEOUT_FORCED_FAILURES.clone()),
        Box::new(STALE_ENTRIES_SWEPT.clone()),
        Box::new(CALLBACK_FAILURES.clone()),
        // Batches
        Box::new(BATCHES_STARTED.clone()),
        Box::new(BATCHES_SETTLED.clone()),
        Box::new(REFRESH_RUNS.clone()),
        Box::new(QUEUE_ITEMS_BLOCKLISTED.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
