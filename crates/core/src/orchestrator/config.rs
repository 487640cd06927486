//! Cycle driver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the cycle driver (`[cycle]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Maximum manifests (or job polls) worked on at once.
    /// 1 processes everything strictly in sequence.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Timeout applied to every external call (seconds).
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// How many times a manifest fetch is attempted before giving up.
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Delay between fetch attempts (milliseconds).
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Platform job statuses that end reconciliation.
    #[serde(default = "default_terminal_statuses")]
    pub terminal_statuses: Vec<String>,

    /// Run cycles on this interval (seconds) instead of once.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_call_timeout() -> u64 {
    30
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    1000 // 1 second
}

fn default_terminal_statuses() -> Vec<String> {
    vec![
        "FINISHED".to_string(),
        "FAILED".to_string(),
        "CANCELLED".to_string(),
    ]
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            call_timeout_secs: default_call_timeout(),
            fetch_attempts: default_fetch_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            terminal_statuses: default_terminal_statuses(),
            interval_secs: None,
        }
    }
}

impl CycleConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval_secs.map(Duration::from_secs)
    }

    /// Whether a platform-reported status ends a job.
    pub fn is_terminal(&self, status: &str) -> bool {
        self.terminal_statuses.iter().any(|s| s == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CycleConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.call_timeout_secs, 30);
        assert_eq!(config.fetch_attempts, 3);
        assert_eq!(config.retry_backoff_ms, 1000);
        assert!(config.interval_secs.is_none());
        assert!(config.is_terminal("FINISHED"));
        assert!(config.is_terminal("CANCELLED"));
        assert!(!config.is_terminal("RUNNING"));
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: CycleConfig = toml::from_str("max_concurrent = 1").unwrap();
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.fetch_attempts, 3);
        assert_eq!(config.terminal_statuses.len(), 3);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            max_concurrent = 8
            call_timeout_secs = 10
            fetch_attempts = 5
            retry_backoff_ms = 250
            terminal_statuses = ["FINISHED", "FAILED"]
            interval_secs = 300
        "#;
        let config: CycleConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_backoff(), Duration::from_millis(250));
        assert_eq!(config.interval(), Some(Duration::from_secs(300)));
        assert!(!config.is_terminal("CANCELLED"));
    }
}
