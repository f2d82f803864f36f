use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Acquisition URL is not empty
/// - Orchestrator limits and durations are non-zero
/// - An enabled orchestrator has an acquisition system to talk to
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if let Some(ref acquisition) = config.acquisition {
        if acquisition.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "acquisition.url cannot be empty".to_string(),
            ));
        }
    }

    let orchestrator = &config.orchestrator;
    if orchestrator.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_attempts must be at least 1".to_string(),
        ));
    }

    for (name, value) in [
        ("batch_timeout_secs", orchestrator.batch_timeout_secs),
        ("sweep_interval_secs", orchestrator.sweep_interval_secs),
        ("stale_after_secs", orchestrator.stale_after_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "orchestrator.{} cannot be 0",
                name
            )));
        }
    }

    if orchestrator.enabled && config.acquisition.is_none() {
        return Err(ConfigError::ValidationError(
            "orchestrator is enabled but no [acquisition] section is configured".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AcquisitionConfig, ServerConfig};
    use crate::orchestrator::OrchestratorConfig;
    use std::net::IpAddr;

    fn acquisition() -> Option<AcquisitionConfig> {
        Some(AcquisitionConfig {
            url: "http://localhost:8686".to_string(),
            api_key: "key".to_string(),
            timeout_secs: 30,
        })
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_acquisition_url_fails() {
        let mut config = Config {
            acquisition: acquisition(),
            ..Default::default()
        };
        config.acquisition.as_mut().unwrap().url = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let config = Config {
            orchestrator: OrchestratorConfig {
                max_attempts: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_validate_zero_duration_fails() {
        let config = Config {
            orchestrator: OrchestratorConfig {
                sweep_interval_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("sweep_interval_secs"));
    }

    #[test]
    fn test_validate_enabled_orchestrator_requires_acquisition() {
        let mut config = Config {
            orchestrator: OrchestratorConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());

        config.acquisition = acquisition();
        assert!(validate_config(&config).is_ok());
    }
}
