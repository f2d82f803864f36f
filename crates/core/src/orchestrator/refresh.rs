//! Library refresh run when a batch settles.
//!
//! Two phases, always in this order:
//! 1. Queue cleanup: every warning/error item in the acquisition queue is
//!    removed with blocklist, and its album searched again when known.
//! 2. Sync enqueue: one `library_scan` job attributed to a resolved owner.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::types::{OrchestratorError, RefreshReport};
use crate::acquisition::{AcquisitionClient, QueueItem};
use crate::library_sync::SyncQueue;
use crate::metrics;

/// Runs the two-phase library refresh.
#[derive(Clone)]
pub struct RefreshTrigger {
    acquisition: Arc<dyn AcquisitionClient>,
    sync_queue: Arc<dyn SyncQueue>,
    queue_page_size: u32,
}

impl RefreshTrigger {
    pub fn new(
        acquisition: Arc<dyn AcquisitionClient>,
        sync_queue: Arc<dyn SyncQueue>,
        queue_page_size: u32,
    ) -> Self {
        Self {
            acquisition,
            sync_queue,
            queue_page_size,
        }
    }

    /// Run both phases. Never fails; problems are logged and reported.
    pub async fn run(&self, reason: &str) -> RefreshReport {
        info!("Running library refresh ({})", reason);

        let mut report = RefreshReport::default();
        self.cleanup_queue(&mut report).await;

        match self.enqueue_scan(reason) {
            Ok(job_id) => {
                info!("Enqueued library scan job {}", job_id);
                metrics::REFRESH_RUNS.with_label_values(&["enqueued"]).inc();
                report.scan_job_id = Some(job_id);
            }
            Err(OrchestratorError::NoActor) => {
                error!("Skipping library scan: no user exists to own the sync job");
                metrics::REFRESH_RUNS.with_label_values(&["no_actor"]).inc();
                report.sync_error = Some(OrchestratorError::NoActor.to_string());
            }
            Err(e) => {
                error!("Failed to enqueue library scan: {}", e);
                metrics::REFRESH_RUNS.with_label_values(&["error"]).inc();
                report.sync_error = Some(e.to_string());
            }
        }

        info!(
            "Library refresh done: {} queue items, {} blocklisted, {} re-searched, {} failed",
            report.queue_items_seen, report.blocklisted, report.researched, report.failed_items
        );
        report
    }

    async fn cleanup_queue(&self, report: &mut RefreshReport) {
        let items = match self.acquisition.queue(self.queue_page_size).await {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    "Failed to list {} queue, skipping cleanup: {}",
                    self.acquisition.name(),
                    e
                );
                return;
            }
        };

        report.queue_items_seen = items.len();
        let problems: Vec<&QueueItem> = items.iter().filter(|item| item.is_problem()).collect();
        report.problem_items = problems.len();

        if problems.is_empty() {
            debug!("No problem items in acquisition queue");
            return;
        }

        for item in problems {
            if let Err(e) = self.acquisition.remove_queue_item(item.id, true, true).await {
                warn!("Failed to remove queue item {} ('{}'): {}", item.id, item.title, e);
                report.failed_items += 1;
                continue;
            }
            report.blocklisted += 1;
            metrics::QUEUE_ITEMS_BLOCKLISTED.inc();
            info!(
                "Removed and blocklisted queue item {} ('{}'): {}",
                item.id,
                item.title,
                item.error_message.as_deref().unwrap_or("no message")
            );

            let Some(album_id) = item.album_id else {
                debug!("Queue item {} has no album, not searching again", item.id);
                continue;
            };

            match self.acquisition.search_album(album_id).await {
                Ok(()) => report.researched += 1,
                Err(e) => {
                    warn!("Failed to search again for album {}: {}", album_id, e);
                    report.failed_items += 1;
                }
            }
        }
    }

    fn enqueue_scan(&self, reason: &str) -> Result<String, OrchestratorError> {
        let owner = self
            .sync_queue
            .resolve_owner()?
            .ok_or(OrchestratorError::NoActor)?;

        debug!("Attributing library scan to {} ({})", owner.username, owner.role);
        Ok(self.sync_queue.enqueue_library_scan(&owner.id, reason)?)
    }
}
