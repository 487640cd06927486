use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::CycleConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Name of the pipeline; prefixes every job name.
    pub pipeline_name: String,
    pub remote_outbox: OutboxConfig,
    pub job: JobTargetConfig,
    pub tapis: TapisConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PipelineConfig {
    /// The immutable identity handed to the orchestration core.
    pub fn identity(&self) -> PipelineIdentity {
        PipelineIdentity {
            pipeline_name: self.pipeline_name.clone(),
            outbox: self.remote_outbox.clone(),
            target: self.job.clone(),
        }
    }
}

/// Where upstream manifests and their inputs appear.
///
/// Adding a storage platform means adding a variant here and a matching
/// `RemoteStorage` implementation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboxConfig {
    /// A directory on a Tapis storage system.
    Tapis { system_id: String, path: String },
}

impl OutboxConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboxConfig::Tapis { .. } => "tapis",
        }
    }

    /// Storage system identifier.
    pub fn storage_id(&self) -> &str {
        match self {
            OutboxConfig::Tapis { system_id, .. } => system_id,
        }
    }

    /// Directory that is listed for manifests.
    pub fn path(&self) -> &str {
        match self {
            OutboxConfig::Tapis { path, .. } => path,
        }
    }

    /// URL the execution platform uses to stage a file from the outbox.
    pub fn file_url(&self, file_path: &str) -> String {
        match self {
            OutboxConfig::Tapis { system_id, .. } => {
                format!("tapis://{}/{}", system_id, file_path.trim_start_matches('/'))
            }
        }
    }
}

/// What kind of job processes a manifest.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobTargetConfig {
    /// A registered Tapis application.
    TapisApp {
        app_id: String,
        app_version: String,
        /// Name of the app's file input that receives the manifest itself.
        manifest_input_name: String,
    },
}

impl JobTargetConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            JobTargetConfig::TapisApp { .. } => "tapis_app",
        }
    }

    pub fn app_id(&self) -> &str {
        match self {
            JobTargetConfig::TapisApp { app_id, .. } => app_id,
        }
    }

    pub fn app_version(&self) -> &str {
        match self {
            JobTargetConfig::TapisApp { app_version, .. } => app_version,
        }
    }

    pub fn manifest_input_name(&self) -> &str {
        match self {
            JobTargetConfig::TapisApp {
                manifest_input_name,
                ..
            } => manifest_input_name,
        }
    }
}

/// Immutable pipeline identity, derived once from the validated config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineIdentity {
    pub pipeline_name: String,
    pub outbox: OutboxConfig,
    pub target: JobTargetConfig,
}

/// Tapis tenant connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TapisConfig {
    /// Tenant base URL (e.g., "https://tacc.tapis.io")
    pub base_url: String,
    pub username: String,
    /// Pre-minted access token. Falls back to environment variables when absent.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pipeline-meta.db")
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write Prometheus text exposition here after every cycle.
    #[serde(default)]
    pub textfile_path: Option<PathBuf>,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub pipeline_name: String,
    pub remote_outbox: OutboxConfig,
    pub job: JobTargetConfig,
    pub tapis: SanitizedTapisConfig,
    pub database: DatabaseConfig,
    pub cycle: CycleConfig,
}

/// Sanitized Tapis config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTapisConfig {
    pub base_url: String,
    pub username: String,
    pub access_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&PipelineConfig> for SanitizedConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            pipeline_name: config.pipeline_name.clone(),
            remote_outbox: config.remote_outbox.clone(),
            job: config.job.clone(),
            tapis: SanitizedTapisConfig {
                base_url: config.tapis.base_url.clone(),
                username: config.tapis.username.clone(),
                access_token_configured: config
                    .tapis
                    .access_token
                    .as_ref()
                    .is_some_and(|t| !t.is_empty()),
                timeout_secs: config.tapis.timeout_secs,
            },
            database: config.database.clone(),
            cycle: config.cycle.clone(),
        }
    }
}
