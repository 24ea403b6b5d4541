use super::{
    types::{BackoffKind, Config, FetcherBackend},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Batch size, attempt budget and size threshold are nonzero
/// - Holding directory and final store are distinct
/// - Command backend has a program
/// - Exponential backoff does not shrink
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.batch.size == 0 {
        return Err(ConfigError::ValidationError(
            "batch.size cannot be 0".to_string(),
        ));
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts cannot be 0".to_string(),
        ));
    }

    if config.retry.backoff == BackoffKind::Exponential
        && !(config.retry.multiplier >= 1.0 && config.retry.multiplier.is_finite())
    {
        return Err(ConfigError::ValidationError(format!(
            "retry.multiplier must be at least 1.0, got {}",
            config.retry.multiplier
        )));
    }

    if config.triage.max_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "triage.max_size_bytes cannot be 0".to_string(),
        ));
    }

    if config.triage.extension.trim_start_matches('.').is_empty() {
        return Err(ConfigError::ValidationError(
            "triage.extension cannot be empty".to_string(),
        ));
    }

    if config.paths.holding_dir == config.paths.final_store {
        return Err(ConfigError::ValidationError(format!(
            "paths.holding_dir and paths.final_store must differ (both {})",
            config.paths.holding_dir.display()
        )));
    }

    if config.fetcher.backend == FetcherBackend::Command {
        let program = config.fetcher.command.program.as_deref().unwrap_or("");
        if program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "fetcher.command.program is required when fetcher.backend = \"command\""
                    .to_string(),
            ));
        }
    }

    Ok(())
}
