//! Correlates acquisition downloads with persisted job records.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::jobs::JobStore;

/// Best-effort linker between a new download and the job that asked for it.
#[derive(Clone)]
pub struct JobLinker {
    jobs: Arc<dyn JobStore>,
}

impl JobLinker {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    /// Claim unlinked jobs targeting `album_ref` for `download_id`.
    ///
    /// Never fails; errors are logged. Returns the number of jobs linked.
    pub fn link(&self, album_ref: &str, download_id: &str) -> usize {
        match self.jobs.link_external_ref(album_ref, download_id) {
            Ok(0) => {
                debug!(
                    download_id = %download_id,
                    "No unlinked job found for album {}", album_ref
                );
                0
            }
            Ok(count) => {
                info!(
                    download_id = %download_id,
                    "Linked {} job(s) for album {}", count, album_ref
                );
                count
            }
            Err(e) => {
                warn!(
                    download_id = %download_id,
                    "Failed to link jobs for album {}: {}", album_ref, e
                );
                0
            }
        }
    }
}
