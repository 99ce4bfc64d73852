use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::ActivationError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// PostgreSQL connection URL for the ledger
    pub database_url: String,
    #[serde(default)]
    pub partner: PartnerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Partner system configuration.
///
/// `mode` selects the gateway implementation at process start:
/// "remote" drives the partner over HTTP, "local" records the
/// partner-of-record directly in the same database.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PartnerConfig {
    pub mode: PartnerMode,
    pub activation_url: String,
    pub validation_url: String,
    pub api_key: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartnerMode {
    Remote,
    Local,
}

impl Default for PartnerConfig {
    fn default() -> Self {
        Self {
            mode: PartnerMode::Local,
            activation_url: "http://localhost:8000/api/v1/partner/activate".to_string(),
            validation_url: "http://localhost:8000/api/v1/partner/validate".to_string(),
            api_key: "partner-api-key".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Fast-status cache configuration.
///
/// The projection is in-process; `url` is the recognized connection target
/// for deployments that point it at an external store.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Retry budget per activation job (attempts, not re-tries)
    pub max_attempts: u32,
    /// Base backoff between attempts in milliseconds (doubles per attempt)
    pub backoff_ms: u64,
    /// Age after which a PROCESSING transaction is considered stuck
    pub stale_after_secs: u64,
    /// Interval of the stale-recovery sweep in seconds
    pub recovery_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
            stale_after_secs: 120,
            recovery_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config/{env}.yaml`, then apply environment
    /// variable overrides for the deployment-sensitive options.
    pub fn load(env: &str) -> Result<Self, ActivationError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|e| {
            ActivationError::Config(format!("Failed to read config file {}: {}", config_path, e))
        })?;
        let mut config: AppConfig = serde_yaml::from_str(&content)
            .map_err(|e| ActivationError::Config(format!("Failed to parse config yaml: {}", e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Recognized environment overrides (original deployment contract).
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Ok(v) = std::env::var("PARTNER_ACTIVATION_URL") {
            self.partner.activation_url = v;
        }
        if let Ok(v) = std::env::var("PARTNER_VALIDATION_URL") {
            self.partner.validation_url = v;
        }
        if let Ok(v) = std::env::var("PARTNER_API_KEY") {
            self.partner.api_key = v;
        }
        if let Ok(v) = std::env::var("PARTNER_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.partner.timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("PARTNER_MODE") {
            match v.to_lowercase().as_str() {
                "remote" => self.partner.mode = PartnerMode::Remote,
                "local" => self.partner.mode = PartnerMode::Local,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("CACHE_URL") {
            self.cache.url = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_deserialize() {
        let yaml = r#"
log_level: "info"
log_dir: "./logs"
log_file: "offerflow.log"
use_json: false
rotation: "daily"
database_url: "postgres://localhost/offerflow"
partner:
  mode: remote
  activation_url: "http://partner:8000/api/v1/partner/activate"
  validation_url: "http://partner:8000/api/v1/partner/validate"
  api_key: "secret"
  timeout_secs: 10
worker:
  max_attempts: 3
  backoff_ms: 250
  stale_after_secs: 60
  recovery_interval_secs: 30
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.partner.mode, PartnerMode::Remote);
        assert_eq!(config.partner.timeout_secs, 10);
        assert_eq!(config.worker.max_attempts, 3);
        assert!(config.cache.url.is_none());
    }

    #[test]
    fn test_partner_defaults() {
        let yaml = r#"
log_level: "info"
log_dir: "./logs"
log_file: "offerflow.log"
use_json: false
rotation: "never"
database_url: "postgres://localhost/offerflow"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.partner.mode, PartnerMode::Local);
        assert_eq!(config.partner.timeout_secs, 30);
        assert_eq!(config.worker.max_attempts, 3);
    }
}
