use super::{types::PipelineConfig, ConfigError};

/// Validate configuration
/// Serde enforces presence and shape; this checks values:
/// - Names and identifiers are non-empty
/// - Cycle limits and timeouts are non-zero
/// - An access token is available
pub fn validate_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.pipeline_name.trim().is_empty() {
        return Err(invalid("pipeline_name cannot be empty"));
    }

    if config.remote_outbox.storage_id().trim().is_empty() {
        return Err(invalid("remote_outbox.system_id cannot be empty"));
    }

    if config.job.app_id().trim().is_empty() {
        return Err(invalid("job.app_id cannot be empty"));
    }

    if config.job.manifest_input_name().trim().is_empty() {
        return Err(invalid("job.manifest_input_name cannot be empty"));
    }

    if config.tapis.base_url.trim().is_empty() {
        return Err(invalid("tapis.base_url cannot be empty"));
    }

    if config.tapis.timeout_secs == 0 {
        return Err(invalid("tapis.timeout_secs cannot be 0"));
    }

    if !config
        .tapis
        .access_token
        .as_ref()
        .is_some_and(|t| !t.is_empty())
    {
        return Err(invalid(
            "no Tapis access token in config or TAPIS_PIPELINES_ACCESS_TOKEN",
        ));
    }

    let cycle = &config.cycle;
    if cycle.max_concurrent == 0 {
        return Err(invalid("cycle.max_concurrent cannot be 0"));
    }
    if cycle.fetch_attempts == 0 {
        return Err(invalid("cycle.fetch_attempts cannot be 0"));
    }
    if cycle.call_timeout_secs == 0 {
        return Err(invalid("cycle.call_timeout_secs cannot be 0"));
    }
    if cycle.terminal_statuses.is_empty() {
        return Err(invalid("cycle.terminal_statuses cannot be empty"));
    }
    if cycle.interval_secs == Some(0) {
        return Err(invalid("cycle.interval_secs cannot be 0"));
    }

    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> PipelineConfig {
        load_config_from_str(
            r#"
pipeline_name = "word_stats"

[remote_outbox]
kind = "tapis"
system_id = "word_stats.outbox"
path = "/outbox"

[job]
kind = "tapis_app"
app_id = "word-stats"
app_version = "0.1"
manifest_input_name = "manifest"

[tapis]
base_url = "https://tacc.tapis.io"
username = "testuser"
access_token = "abc"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_pipeline_name_fails() {
        let mut config = valid_config();
        config.pipeline_name = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_missing_token_fails() {
        let mut config = valid_config();
        config.tapis.access_token = None;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("access token"));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = valid_config();
        config.cycle.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_fetch_attempts_fails() {
        let mut config = valid_config();
        config.cycle.fetch_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_terminal_set_fails() {
        let mut config = valid_config();
        config.cycle.terminal_statuses.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let mut config = valid_config();
        config.cycle.interval_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
