//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the download completion orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable the orchestrator.
    /// When disabled, the server runs without download tracking.
    #[serde(default)]
    pub enabled: bool,

    /// Attempts per download before it is abandoned (first attempt included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Batch deadline (seconds), armed when the first download of a batch
    /// is registered. Remaining downloads are force-failed when it fires.
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,

    /// How often the stale sweep runs (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Age (seconds) after which the sweep drops an entry without cleanup.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Whether a sweep that empties the registry settles the batch
    /// (and therefore runs the library refresh).
    #[serde(default = "default_true")]
    pub refresh_after_sweep: bool,

    /// Page size used when listing the acquisition queue.
    #[serde(default = "default_queue_page_size")]
    pub queue_page_size: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_batch_timeout() -> u64 {
    600 // 10 minutes
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

fn default_stale_after() -> u64 {
    1800 // 30 minutes
}

fn default_true() -> bool {
    true
}

fn default_queue_page_size() -> u32 {
    1000
}

impl OrchestratorConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs as i64)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_max_attempts(),
            batch_timeout_secs: default_batch_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            stale_after_secs: default_stale_after(),
            refresh_after_sweep: default_true(),
            queue_page_size: default_queue_page_size(),
        }
    }
}
