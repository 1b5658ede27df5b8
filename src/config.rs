//! Configuration loading and management
//!
//! Handles parsing of `.taskdb.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lock::{LockPolicy, DEFAULT_LOCK_TIMEOUT_MS};

/// Name of the configuration file looked up by [`Config::load_from_dir`]
pub const CONFIG_FILE: &str = ".taskdb.toml";

/// Upper bound for `lock_timeout_ms`
const MAX_LOCK_TIMEOUT_MS: u64 = 600_000;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the data files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_location: Option<PathBuf>,

    /// Take advisory locks when reading and committing data files
    #[serde(default = "default_true")]
    pub locking: bool,

    /// How long to wait for a contended lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Run the garbage-collection hook
    #[serde(default = "default_true")]
    pub gc: bool,

    /// Emit per-file diagnostics on every commit
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: None,
            locking: true,
            lock_timeout_ms: default_lock_timeout_ms(),
            gc: true,
            debug: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Config {
    /// Load configuration from a `.taskdb.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults when it has none
    pub fn load_from_dir(dir: &Path) -> crate::error::Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Locking behaviour for data files
    pub fn lock_policy(&self) -> LockPolicy {
        if self.locking {
            LockPolicy::with_timeout(self.lock_timeout_ms)
        } else {
            LockPolicy::disabled()
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        if let Some(location) = &self.data_location {
            if location.as_os_str().is_empty() {
                return Err(crate::error::Error::InvalidConfig(
                    "data_location cannot be empty".to_string(),
                ));
            }
        }
        if self.lock_timeout_ms > MAX_LOCK_TIMEOUT_MS {
            return Err(crate::error::Error::InvalidConfig(format!(
                "lock_timeout_ms must be <= {MAX_LOCK_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}
