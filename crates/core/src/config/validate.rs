use super::{types::Config, ConfigError};

/// Validate configuration.
///
/// Fails fast on anything the process can't recover from at runtime rather
/// than silently clamping: a bad port or a seeding goal with seeding disabled
/// should stop startup, not quietly degrade.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.jackett.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "jackett.url must not be empty".to_string(),
        ));
    }

    if config.qbittorrent.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "qbittorrent.url must not be empty".to_string(),
        ));
    }

    let orch = &config.orchestrator;

    if orch.polling_interval_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.polling_interval_seconds cannot be 0".to_string(),
        ));
    }

    if orch.max_concurrent_downloads == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_concurrent_downloads cannot be 0".to_string(),
        ));
    }

    if orch.min_search_confidence > 100 {
        return Err(ConfigError::ValidationError(
            "orchestrator.min_search_confidence must be between 0 and 100".to_string(),
        ));
    }

    if !orch.seeding_enabled
        && (orch.seed_ratio_limit.is_some() || orch.seed_time_limit_seconds.is_some())
    {
        return Err(ConfigError::ValidationError(
            "orchestrator.seed_ratio_limit/seed_time_limit_seconds require seeding_enabled"
                .to_string(),
        ));
    }

    if orch.wait_for_seeding_completion && !orch.seeding_enabled {
        return Err(ConfigError::ValidationError(
            "orchestrator.wait_for_seeding_completion requires seeding_enabled".to_string(),
        ));
    }

    Ok(())
}
