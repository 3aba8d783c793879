//! Configuration file handling.
//!
//! Settings live in `~/.dockdash/config.toml`. A missing file is created
//! with the documented defaults; missing keys fall back to their defaults.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::dashboard::RefreshPlan;
use crate::docker::locate_runtime;
use crate::logging::LogConfig;

/// Maximum config file size (512KB).
const MAX_FILE_SIZE: u64 = 512 * 1024;

/// Default poll period in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5000;

/// Shortest accepted poll period in milliseconds.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 500;

/// Longest accepted poll period in milliseconds (one hour).
pub const MAX_REFRESH_INTERVAL_MS: u64 = 3_600_000;

/// Contents written when no config file exists.
pub const DEFAULT_CONFIG: &str = r#"# dockdash configuration

# How often the dashboard polls the runtime, in milliseconds (500 - 3600000).
refresh_interval_ms = 5000

# Path to the runtime executable. When unset, well-known install
# locations are probed and `docker` on PATH is the fallback.
# runtime_path = "/usr/local/bin/docker"

# List only dangling images and volumes (cleanup view).
cleanup_view = false

[log]
# Set to false to disable file logging.
enabled = true
# trace, debug, info, warn, error or off. RUST_LOG takes precedence.
level = "info"
# Log files older than this many hours are deleted at startup.
retention_hours = 24
"#;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// File too large.
    #[error("File too large (max {MAX_FILE_SIZE} bytes)")]
    FileTooLarge,

    /// A value is out of its allowed domain.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Poll period in milliseconds; clamped on use.
    pub refresh_interval_ms: u64,
    /// Runtime executable override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_path: Option<PathBuf>,
    /// List only dangling images and volumes.
    pub cleanup_view: bool,
    /// File logging.
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            runtime_path: None,
            cleanup_view: false,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Returns the default config path (`~/.dockdash/config.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dockdash")
            .join("config.toml")
    }

    /// Loads the config from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads the config from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        assert!(!path.as_os_str().is_empty(), "path must not be empty");

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            info!("Wrote default config to {}", path.display());
            return Ok(Self::default());
        }

        let metadata = fs::metadata(path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ConfigError::FileTooLarge);
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates config text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;

        if config
            .runtime_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::Invalid(
                "runtime_path must not be empty".to_string(),
            ));
        }

        config.log.level = LogConfig::parse_level(&config.log.level);
        Ok(config)
    }

    /// Writes the config to `path`, replacing any existing file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Poll period, clamped to the accepted range.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(
            self.refresh_interval_ms
                .clamp(MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS),
        )
    }

    /// Listings to collect on each refresh.
    #[must_use]
    pub fn refresh_plan(&self) -> RefreshPlan {
        if self.cleanup_view {
            RefreshPlan::cleanup()
        } else {
            RefreshPlan::default()
        }
    }

    /// Runtime executable: the override if set, else the probed path.
    #[must_use]
    pub fn runtime_binary(&self) -> PathBuf {
        self.runtime_path
            .clone()
            .unwrap_or_else(|| locate_runtime().to_path_buf())
    }
}
