//! Download completion orchestrator implementation.
//!
//! Tracks in-flight album downloads and settles them as a batch:
//! - Signals: `add`, `complete`, `fail` (from the acquisition side)
//! - Deadline: single-shot timer armed when a batch starts
//! - Sweep: periodic removal of entries that were never resolved
//!
//! All registry, timer and callback state lives behind one mutex. Network and
//! database calls are made after the lock is released, using cloned data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::acquisition::{AcquisitionClient, AcquisitionError};
use crate::jobs::JobStore;
use crate::library_sync::SyncQueue;
use crate::metrics;

use super::callbacks::{CallbackRegistry, UnavailableAlbumCallback};
use super::config::OrchestratorConfig;
use super::linker::JobLinker;
use super::refresh::RefreshTrigger;
use super::registry::{FailureAction, Insert, Registry};
use super::types::{
    AddDownload, AddOutcome, CompleteOutcome, DownloadEntry, FailOutcome, OrchestratorStatus,
    RefreshReport, UnavailableAlbum,
};

/// Reason recorded for failures forced by the batch deadline.
pub const TIMEOUT_REASON: &str = "timeout";

/// Where a failure signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    /// Reported by a collaborator.
    Reported,
    /// Forced by the batch deadline; skips the attempt budget.
    Timeout,
}

struct DeadlineTimer {
    epoch: u64,
    handle: JoinHandle<()>,
}

/// State shared by every signal, the deadline and the sweep.
struct OrchestratorState {
    registry: Registry,
    deadline: Option<DeadlineTimer>,
    callbacks: CallbackRegistry,
    sweep: Option<JoinHandle<()>>,
}

struct OrchestratorInner {
    config: OrchestratorConfig,
    acquisition: Arc<dyn AcquisitionClient>,
    jobs: Arc<dyn JobStore>,
    linker: JobLinker,
    refresh: RefreshTrigger,
    state: Mutex<OrchestratorState>,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

/// The download completion orchestrator.
///
/// Cheap to clone; every clone drives the same registry.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl DownloadOrchestrator {
    /// Create a new orchestrator. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: OrchestratorConfig,
        acquisition: Arc<dyn AcquisitionClient>,
        jobs: Arc<dyn JobStore>,
        sync_queue: Arc<dyn SyncQueue>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let refresh = RefreshTrigger::new(
            Arc::clone(&acquisition),
            sync_queue,
            config.queue_page_size,
        );

        Self {
            inner: Arc::new(OrchestratorInner {
                linker: JobLinker::new(Arc::clone(&jobs)),
                refresh,
                config,
                acquisition,
                jobs,
                state: Mutex::new(OrchestratorState {
                    registry: Registry::new(),
                    deadline: None,
                    callbacks: CallbackRegistry::new(),
                    sweep: None,
                }),
                running: AtomicBool::new(false),
                shutdown_tx,
            }),
        }
    }

    /// Start the orchestrator (spawns the stale sweep).
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!(
            "Starting download orchestrator (sweep every {}s, stale after {}s)",
            self.inner.config.sweep_interval_secs, self.inner.config.stale_after_secs
        );

        let handle = self.spawn_sweep_loop();
        self.inner.state.lock().await.sweep = Some(handle);
    }

    /// Stop the sweep, cancel the deadline and forget every tracked download.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let was_running = self.inner.running.swap(false, Ordering::SeqCst);
        let _ = self.inner.shutdown_tx.send(());

        let mut state = self.inner.state.lock().await;
        if let Some(timer) = state.deadline.take() {
            timer.handle.abort();
        }
        if let Some(sweep) = state.sweep.take() {
            sweep.abort();
        }

        let dropped = state.registry.len();
        state.registry.clear();

        if was_running || dropped > 0 {
            info!(
                "Download orchestrator stopped ({} tracked downloads dropped)",
                dropped
            );
        }
    }

    /// Whether the stale sweep is running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Relaxed)
    }

    /// Subscribe to albums that are given up on.
    pub async fn on_unavailable_album<F>(&self, callback: F)
    where
        F: Fn(&UnavailableAlbum) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: UnavailableAlbumCallback = Arc::new(callback);
        self.inner.state.lock().await.callbacks.register(callback);
    }

    /// Remove every subscriber.
    pub async fn clear_callbacks(&self) {
        self.inner.state.lock().await.callbacks.clear();
    }

    /// Start tracking a download.
    ///
    /// A duplicate ID is ignored. Job linking is attempted either way.
    pub async fn add(&self, request: AddDownload) -> AddOutcome {
        let download_id = request.download_id.clone();
        let album_ref = request.album_ref.clone();
        let entry = DownloadEntry::new(request, Utc::now());

        let outcome = {
            let mut state = self.inner.state.lock().await;
            match state.registry.insert(entry) {
                Insert::Duplicate => {
                    warn!(download_id = %download_id, "Download already tracked, ignoring");
                    AddOutcome::Duplicate
                }
                Insert::Inserted { batch_started } => {
                    metrics::DOWNLOADS_TRACKED.inc();
                    if let Some(epoch) = batch_started {
                        metrics::BATCHES_STARTED.inc();
                        self.arm_deadline(&mut state, epoch);
                        info!(download_id = %download_id, "Batch {} started", epoch);
                    }
                    info!(
                        download_id = %download_id,
                        "Tracking download ({} in flight)",
                        state.registry.len()
                    );
                    AddOutcome::Tracked
                }
            }
        };

        self.inner.linker.link(&album_ref, &download_id);
        outcome
    }

    /// Mark a download as completed.
    pub async fn complete(&self, download_id: &str) -> CompleteOutcome {
        let settled = {
            let mut state = self.inner.state.lock().await;
            let Some(entry) = state.registry.remove(download_id) else {
                debug!(download_id = %download_id, "Completion for untracked download, ignoring");
                return CompleteOutcome::Unknown;
            };

            metrics::DOWNLOADS_COMPLETED.inc();
            info!(
                download_id = %download_id,
                "Download of '{}' completed ({} still in flight)",
                entry.album_title,
                state.registry.len()
            );
            Self::settle(&mut state)
        };

        if let Some(epoch) = settled {
            self.run_refresh(epoch).await;
        }
        CompleteOutcome::Completed
    }

    /// Report a failed download.
    ///
    /// Issues a new search while attempts remain; otherwise cleans up the
    /// album in the acquisition system, fails its jobs, notifies subscribers
    /// and stops tracking it.
    pub async fn fail(&self, download_id: &str, reason: &str) -> FailOutcome {
        self.handle_failure(download_id, reason, FailureKind::Reported)
            .await
    }

    /// Current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let state = self.inner.state.lock().await;
        OrchestratorStatus {
            running: self.is_running(),
            active_count: state.registry.len(),
            entries: state.registry.entries(),
            timeout_active: state
                .deadline
                .as_ref()
                .map(|t| !t.handle.is_finished())
                .unwrap_or(false),
            batch_epoch: state.registry.epoch(),
            batches_settled: state.registry.settled(),
            callbacks_registered: state.callbacks.len(),
        }
    }

    /// Run the library refresh now, outside of any batch.
    pub async fn force_refresh(&self) -> RefreshReport {
        info!("Manual library refresh requested");
        self.inner.refresh.run("manual refresh").await
    }

    /// Drop entries older than the configured age. Returns how many were removed.
    pub async fn sweep_stale(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub(crate) async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.inner.config.stale_after();

        let (removed, settled) = {
            let mut state = self.inner.state.lock().await;
            let mut removed = 0;
            for id in state.registry.stale_ids(cutoff) {
                if let Some(entry) = state.registry.remove(&id) {
                    warn!(
                        download_id = %id,
                        "Dropping stale download '{}' (started {})",
                        entry.album_title, entry.started_at
                    );
                    removed += 1;
                }
            }

            let settled = if removed > 0 && self.inner.config.refresh_after_sweep {
                Self::settle(&mut state)
            } else {
                None
            };
            (removed, settled)
        };

        if removed > 0 {
            metrics::STALE_ENTRIES_SWEPT.inc_by(removed as u64);
        }
        if let Some(epoch) = settled {
            self.run_refresh(epoch).await;
        }
        removed
    }

    fn spawn_sweep_loop(&self) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval();
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Stale sweep started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Stale sweep received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else {
                            break;
                        };
                        let removed = DownloadOrchestrator { inner }.sweep_stale().await;
                        if removed > 0 {
                            info!("Stale sweep removed {} downloads", removed);
                        }
                    }
                }
            }
            info!("Stale sweep stopped");
        })
    }

    /// Arm the batch deadline for `epoch`, replacing any older timer.
    fn arm_deadline(&self, state: &mut OrchestratorState, epoch: u64) {
        if let Some(old) = state.deadline.take() {
            old.handle.abort();
        }

        let inner: Weak<OrchestratorInner> = Arc::downgrade(&self.inner);
        let timeout = self.inner.config.batch_timeout();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = inner.upgrade() {
                DownloadOrchestrator { inner }.on_deadline(epoch).await;
            }
        });

        state.deadline = Some(DeadlineTimer { epoch, handle });
    }

    /// Force-fail everything still tracked when a batch deadline fires.
    async fn on_deadline(&self, epoch: u64) {
        let ids = {
            let mut state = self.inner.state.lock().await;
            match &state.deadline {
                Some(timer) if timer.epoch == epoch => {}
                _ => return,
            }
            // Detach our own handle so settling never aborts this task
            state.deadline = None;
            state.registry.ids()
        };

        if ids.is_empty() {
            return;
        }

        warn!(
            "Batch {} deadline reached with {} downloads in flight, forcing failure",
            epoch,
            ids.len()
        );
        metrics::TIMEOUT_FORCED_FAILURES.inc_by(ids.len() as u64);

        join_all(
            ids.iter()
                .map(|id| self.handle_failure(id, TIMEOUT_REASON, FailureKind::Timeout)),
        )
        .await;
    }

    async fn handle_failure(&self, download_id: &str, reason: &str, kind: FailureKind) -> FailOutcome {
        let action = {
            let mut state = self.inner.state.lock().await;
            state.registry.register_failure(
                download_id,
                reason,
                kind == FailureKind::Timeout,
                self.inner.config.max_attempts,
            )
        };

        match action {
            FailureAction::Unknown => {
                debug!(download_id = %download_id, "Failure for untracked download, ignoring");
                FailOutcome::Unknown
            }
            FailureAction::AlreadyExhausting => {
                debug!(download_id = %download_id, "Download already being cleaned up");
                FailOutcome::AlreadyExhausting
            }
            FailureAction::Retry { entry, attempt } => {
                metrics::DOWNLOAD_FAILURES
                    .with_label_values(&["retrying"])
                    .inc();
                info!(
                    download_id = %download_id,
                    "Download of '{}' failed ({}), starting attempt {}/{}",
                    entry.album_title, reason, attempt, self.inner.config.max_attempts
                );
                self.spawn_search_again(entry);
                FailOutcome::Retrying { attempt }
            }
            FailureAction::Exhaust { entry } => {
                metrics::DOWNLOAD_FAILURES
                    .with_label_values(&["exhausted"])
                    .inc();
                self.exhaust(entry, reason).await;
                FailOutcome::Exhausted
            }
        }
    }

    /// Fire-and-forget search for the entry's album.
    fn spawn_search_again(&self, entry: DownloadEntry) {
        let acquisition = Arc::clone(&self.inner.acquisition);
        tokio::spawn(async move {
            let result = async {
                let album_id = match entry.album_id {
                    Some(id) => id,
                    None => acquisition
                        .find_album(&entry.album_ref)
                        .await?
                        .map(|a| a.id)
                        .ok_or_else(|| AcquisitionError::NotFound(entry.album_ref.clone()))?,
                };
                acquisition.search_album(album_id).await
            }
            .await;

            if let Err(e) = result {
                warn!(
                    download_id = %entry.download_id,
                    "Failed to search again for '{}': {}", entry.album_title, e
                );
            }
        });
    }

    /// Give up on a download: cleanup, fail jobs, notify, then remove.
    async fn exhaust(&self, entry: DownloadEntry, reason: &str) {
        warn!(
            download_id = %entry.download_id,
            "Giving up on '{}' by {} after {} attempt(s): {}",
            entry.album_title, entry.artist_name, entry.attempts, reason
        );

        self.cleanup_acquisition(&entry).await;

        match self.inner.jobs.mark_failed_by_subject(&entry.album_title, reason) {
            Ok(0) => debug!("No open jobs for '{}'", entry.album_title),
            Ok(count) => info!("Marked {} job(s) for '{}' as failed", count, entry.album_title),
            Err(e) => warn!("Failed to mark jobs for '{}' as failed: {}", entry.album_title, e),
        }

        let callbacks = self.inner.state.lock().await.callbacks.clone();
        callbacks.notify(&UnavailableAlbum::from_entry(&entry, reason));

        let settled = {
            let mut state = self.inner.state.lock().await;
            if state.registry.remove(&entry.download_id).is_some() {
                Self::settle(&mut state)
            } else {
                // Completed, swept or shut down while cleanup ran
                None
            }
        };

        if let Some(epoch) = settled {
            self.run_refresh(epoch).await;
        }
    }

    /// Delete the album and, if it was the artist's last monitored album,
    /// the artist. Each step is independent and best-effort.
    async fn cleanup_acquisition(&self, entry: &DownloadEntry) {
        let acquisition = &self.inner.acquisition;

        let (album_id, artist_id) = match (entry.album_id, entry.artist_id) {
            (Some(album), Some(artist)) => (Some(album), Some(artist)),
            (album_id, artist_id) => match acquisition.find_album(&entry.album_ref).await {
                Ok(Some(album)) => (album_id.or(Some(album.id)), artist_id.or(Some(album.artist_id))),
                Ok(None) => (album_id, artist_id),
                Err(e) => {
                    warn!("Failed to look up album {}: {}", entry.album_ref, e);
                    (album_id, artist_id)
                }
            },
        };

        match album_id {
            Some(id) => match acquisition.delete_album(id).await {
                Ok(()) => info!("Deleted album {} ('{}')", id, entry.album_title),
                Err(e) => warn!("Failed to delete album {}: {}", id, e),
            },
            None => debug!("'{}' unknown to {}, nothing to delete", entry.album_title, acquisition.name()),
        }

        let Some(artist_id) = artist_id else {
            return;
        };

        let remaining = match acquisition.artist_albums(artist_id).await {
            Ok(albums) => albums
                .iter()
                .filter(|a| a.monitored && Some(a.id) != album_id)
                .count(),
            Err(e) => {
                warn!("Failed to list albums of artist {}: {}", artist_id, e);
                return;
            }
        };

        if remaining > 0 {
            debug!("Artist {} keeps {} monitored album(s)", artist_id, remaining);
            return;
        }

        match acquisition.delete_artist(artist_id).await {
            Ok(()) => info!("Deleted artist {} ({})", artist_id, entry.artist_name),
            Err(e) => warn!("Failed to delete artist {}: {}", artist_id, e),
        }
    }

    /// Close the batch if the registry is now empty, cancelling its deadline.
    fn settle(state: &mut OrchestratorState) -> Option<u64> {
        let epoch = state.registry.settle_if_empty()?;
        if let Some(timer) = state.deadline.take() {
            timer.handle.abort();
        }
        metrics::BATCHES_SETTLED.inc();
        Some(epoch)
    }

    async fn run_refresh(&self, epoch: u64) {
        info!("Batch {} settled", epoch);
        self.inner
            .refresh
            .run(&format!("batch {} settled", epoch))
            .await;
    }
}
