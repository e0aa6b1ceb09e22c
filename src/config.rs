use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::{LifecycleError, LifecycleResult};
use crate::upgrade::RetryPolicy;

const DEFAULT_MAX_ATTEMPTS: u32 = 6;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 600;
const DEFAULT_EXPLORER_URL: &str = "https://blockstream.info/api";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 8;

/// Top-level configuration for the proof lifecycle services.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
    pub retry: RetryConfig,
    pub explorer: ExplorerConfig,
}

impl LifecycleConfig {
    pub fn load(path: &Path) -> LifecycleResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|err| LifecycleError::Config(format!("unable to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> LifecycleResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| LifecycleError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(LifecycleError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        self.explorer.url()?;
        Ok(())
    }
}

/// Retry budget for the upgrade polling loop.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of upgrade attempts before giving up.
    pub max_attempts: u32,
    /// Delay between two attempts, in seconds.
    pub interval_secs: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
        }
    }
}

/// Block explorer endpoint and per-request timeouts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Base URL of an Esplora-compatible REST API.
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl ExplorerConfig {
    pub fn url(&self) -> LifecycleResult<Url> {
        Url::parse(&self.base_url)
            .map_err(|err| LifecycleError::Config(format!("invalid explorer.base_url: {err}")))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EXPLORER_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}
