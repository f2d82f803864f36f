pub mod acquisition;
pub mod config;
pub mod jobs;
pub mod library_sync;
pub mod metrics;
pub mod orchestrator;
pub mod testing;

pub use acquisition::{
    AcquisitionAlbum, AcquisitionClient, AcquisitionError, LidarrClient, QueueItem,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AcquisitionConfig, Config, ConfigError,
    SanitizedConfig,
};
pub use jobs::{
    CreateJobRequest, DownloadJob, JobFilter, JobStatus, JobStore, JobStoreError, SqliteJobStore,
};
pub use library_sync::{SqliteSyncQueue, SyncJob, SyncOwner, SyncQueue, SyncQueueError};
pub use orchestrator::{
    AddDownload, AddOutcome, CompleteOutcome, DownloadContext, DownloadEntry,
    DownloadOrchestrator, EntryState, FailOutcome, OrchestratorConfig, OrchestratorError,
    OrchestratorStatus, RefreshReport, UnavailableAlbum,
};
