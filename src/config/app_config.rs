//! `walkthrough.toml` schema, loading, and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::defaults;
use crate::animator::AnimationTiming;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SAFETY_WALKTHROUGH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "walkthrough.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AppConfig::load()` which searches:
/// 1. `$SAFETY_WALKTHROUGH_CONFIG`
/// 2. `./walkthrough.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Analysis service connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Stage reveal timings
    #[serde(default)]
    pub animation: AnimationConfig,
}

impl AppConfig {
    /// Load configuration using the standard search order. A file that fails
    /// to read, parse, or validate is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), base_url = %config.backend.base_url, "Loaded config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(base_url = %config.backend.base_url, "Loaded config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every section, collecting all problems.
    ///
    /// - `backend.base_url` must be an http(s) URL
    /// - `backend.request_timeout_secs` must be > 0
    /// - `backend.max_retries` must be at most 5
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let b = &self.backend;

        let url = b.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "backend.base_url: must start with http:// or https:// (got {:?})",
                b.base_url
            ));
        }
        if b.request_timeout_secs == 0 {
            errors.push("backend.request_timeout_secs: must be > 0".to_string());
        }
        if b.max_retries > defaults::BACKEND_MAX_RETRIES_LIMIT {
            errors.push(format!(
                "backend.max_retries: must be <= {} (got {})",
                defaults::BACKEND_MAX_RETRIES_LIMIT,
                b.max_retries
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the analysis service, without a trailing path
    pub base_url: String,
    /// Whole-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Automatic retries on transport failure
    pub max_retries: u32,
    /// Linear backoff step between retries (ms)
    pub retry_backoff_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BACKEND_BASE_URL.to_string(),
            request_timeout_secs: defaults::BACKEND_TIMEOUT_SECS,
            max_retries: defaults::BACKEND_MAX_RETRIES,
            retry_backoff_ms: defaults::BACKEND_RETRY_BACKOFF_MS,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Time spent in each phase (ms)
    pub phase_interval_ms: u64,
    /// Pause between `complete` and the result (ms)
    pub settle_delay_ms: u64,
    /// Reveal every stage immediately
    pub skip: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            phase_interval_ms: defaults::PHASE_INTERVAL_MS,
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
            skip: false,
        }
    }
}

impl AnimationConfig {
    pub fn timing(&self) -> AnimationTiming {
        AnimationTiming {
            phase_interval: Duration::from_millis(self.phase_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {e}"),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
