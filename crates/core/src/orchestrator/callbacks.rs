//! Unavailable-album subscribers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::types::UnavailableAlbum;
use crate::metrics;

/// Callback invoked when an album is given up on.
pub type UnavailableAlbumCallback =
    Arc<dyn Fn(&UnavailableAlbum) -> anyhow::Result<()> + Send + Sync>;

/// Ordered list of subscribers.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: Vec<UnavailableAlbumCallback>,
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: UnavailableAlbumCallback) {
        self.callbacks.push(callback);
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke every subscriber in registration order.
    ///
    /// A failing or panicking subscriber is logged and skipped; the rest still
    /// run. Returns the number of subscribers that failed.
    pub fn notify(&self, album: &UnavailableAlbum) -> usize {
        let mut failures = 0;

        for (idx, callback) in self.callbacks.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(album))) {
                Ok(Ok(())) => {
                    debug!("Unavailable-album callback {} handled '{}'", idx, album.album_title);
                }
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(
                        "Unavailable-album callback {} failed for '{}': {:#}",
                        idx, album.album_title, e
                    );
                }
                Err(_) => {
                    failures += 1;
                    warn!(
                        "Unavailable-album callback {} panicked for '{}'",
                        idx, album.album_title
                    );
                }
            }
        }

        if failures > 0 {
            metrics::CALLBACK_FAILURES.inc_by(failures as u64);
        }
        failures
    }
}
