//! Download completion orchestrator.
//!
//! Tracks a batch of in-flight album downloads and settles it:
//! - **Retry**: failed downloads are searched again up to `max_attempts`
//! - **Cleanup**: exhausted albums (and orphaned artists) are removed from the
//!   acquisition system, their jobs failed and subscribers notified
//! - **Refresh**: when the batch empties, the acquisition queue is cleaned
//!   and one library scan is enqueued

mod callbacks;
mod config;
mod linker;
mod refresh;
mod registry;
mod runner;
mod types;

pub use callbacks::{CallbackRegistry, UnavailableAlbumCallback};
pub use config::OrchestratorConfig;
pub use linker::JobLinker;
pub use refresh::RefreshTrigger;
pub use runner::{DownloadOrchestrator, TIMEOUT_REASON};
pub use types::{
    AddDownload, AddOutcome, CompleteOutcome, DownloadContext, DownloadEntry, EntryState,
    FailOutcome, OrchestratorError, OrchestratorStatus, RefreshReport, UnavailableAlbum,
};
