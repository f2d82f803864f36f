use albumwatch_core::{Config, DownloadOrchestrator, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Option<DownloadOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Option<DownloadOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// The orchestrator, if enabled in config.
    pub fn orchestrator(&self) -> Option<&DownloadOrchestrator> {
        self.orchestrator.as_ref()
    }
}
