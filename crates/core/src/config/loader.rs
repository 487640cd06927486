use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::PipelineConfig, ConfigError};

/// Environment variables consulted, in order, when the config carries no access token.
const ACCESS_TOKEN_ENV_VARS: [&str; 2] = ["TAPIS_PIPELINES_ACCESS_TOKEN", "_abaco_access_token"];

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let mut config: PipelineConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("PIPELINE_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    resolve_access_token(&mut config);

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<PipelineConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Fill in `tapis.access_token` from the environment if the file left it unset.
pub fn resolve_access_token(config: &mut PipelineConfig) {
    resolve_access_token_with(config, |name| std::env::var(name).ok());
}

fn resolve_access_token_with(
    config: &mut PipelineConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if config
        .tapis
        .access_token
        .as_ref()
        .is_some_and(|t| !t.is_empty())
    {
        return;
    }

    config.tapis.access_token = ACCESS_TOKEN_ENV_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
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

[cycle]
max_concurrent = 2
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(VALID).unwrap();
        assert_eq!(config.pipeline_name, "word_stats");
        assert_eq!(config.cycle.max_concurrent, 2);
    }

    #[test]
    fn test_load_config_from_str_missing_outbox() {
        let toml = r#"
pipeline_name = "word_stats"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/pipeline.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", VALID).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.remote_outbox.storage_id(), "word_stats.outbox");
        assert_eq!(config.tapis.access_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_access_token_from_env_fallback() {
        let mut config = load_config_from_str(VALID).unwrap();
        config.tapis.access_token = None;

        resolve_access_token_with(&mut config, |name| match name {
            "_abaco_access_token" => Some("from-abaco".to_string()),
            _ => None,
        });
        assert_eq!(config.tapis.access_token.as_deref(), Some("from-abaco"));
    }

    #[test]
    fn test_access_token_env_order() {
        let mut config = load_config_from_str(VALID).unwrap();
        config.tapis.access_token = Some(String::new());

        resolve_access_token_with(&mut config, |name| Some(format!("token-{}", name)));
        assert_eq!(
            config.tapis.access_token.as_deref(),
            Some("token-TAPIS_PIPELINES_ACCESS_TOKEN")
        );
    }

    #[test]
    fn test_configured_token_wins() {
        let mut config = load_config_from_str(VALID).unwrap();
        resolve_access_token_with(&mut config, |_| Some("from-env".to_string()));
        assert_eq!(config.tapis.access_token.as_deref(), Some("abc"));
    }
}
