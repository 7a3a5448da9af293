//! Configuration management for the IDMS client

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{IdmsError, IdmsResult};

/// IDMS client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Backend connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Dashboard refresh
    #[serde(default)]
    pub polling: PollingConfig,

    /// Symptom checker bounds
    #[serde(default)]
    pub symptoms: SymptomConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout; there is no retry on expiry
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_emergency_refresh_secs")]
    pub emergency_refresh_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomConfig {
    /// Upper bound on selected + custom symptoms per analysis
    #[serde(default = "default_max_symptoms")]
    pub max_symptoms: usize,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_emergency_refresh_secs() -> u64 {
    30
}

fn default_max_symptoms() -> usize {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            emergency_refresh_secs: default_emergency_refresh_secs(),
        }
    }
}

impl PollingConfig {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.emergency_refresh_secs.max(1))
    }
}

impl Default for SymptomConfig {
    fn default() -> Self {
        Self {
            max_symptoms: default_max_symptoms(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> IdmsResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            IdmsError::Config(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> IdmsResult<Self> {
        toml::from_str(content).map_err(|e| IdmsError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load with precedence: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> IdmsResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `IDMS_*` overrides from `lookup` (the process environment in [`load`](Self::load))
    pub fn apply_overrides<F>(&mut self, lookup: F) -> IdmsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("IDMS_API_BASE_URL") {
            self.api.base_url = url;
        }

        if let Some(secs) = lookup("IDMS_API_TIMEOUT_SECS") {
            self.api.timeout_secs = secs
                .parse()
                .map_err(|_| IdmsError::Config(format!("Invalid IDMS_API_TIMEOUT_SECS: {}", secs)))?;
        }

        if let Some(secs) = lookup("IDMS_EMERGENCY_REFRESH_SECS") {
            self.polling.emergency_refresh_secs = secs.parse().map_err(|_| {
                IdmsError::Config(format!("Invalid IDMS_EMERGENCY_REFRESH_SECS: {}", secs))
            })?;
        }

        Ok(())
    }
}
