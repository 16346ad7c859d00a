//! Configuration management

use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub view: ViewConfig,
    pub source: SourceConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Indent unit prepended once per nesting level
    pub indent_unit: String,
    /// Lines of source context around the focused span
    pub context_lines: u32,
    /// Colorize output with ANSI codes
    pub color: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Maximum number of source resources kept open at once
    pub max_open: usize,
    /// Maximum source file size to open (bytes)
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Fallback poll interval for the file watcher (seconds)
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            view: ViewConfig::default(),
            source: SourceConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            indent_unit: "  ".to_string(),
            context_lines: 2,
            color: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_open: 64,
            max_file_size: 1_048_576, // 1 MiB
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = Self::traceview_home()?;
        Ok(home.join("config.toml"))
    }

    /// Get the traceview home directory
    pub fn traceview_home() -> Result<PathBuf> {
        // TRACEVIEW_HOME wins over the platform default
        if let Ok(home) = std::env::var("TRACEVIEW_HOME") {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("dev", "traceview", "traceview")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine traceview home directory".to_string(),
            })
    }

    /// Ensure home directory exists
    pub fn ensure_home() -> Result<()> {
        let home = Self::traceview_home()?;
        if !home.exists() {
            std::fs::create_dir_all(&home)?;
        }
        Ok(())
    }

    /// Get the event socket path
    pub fn socket_path() -> Result<PathBuf> {
        if let Ok(socket) = std::env::var("TRACEVIEW_SOCKET") {
            return Ok(PathBuf::from(socket));
        }
        let home = Self::traceview_home()?;
        Ok(home.join("viewer.sock"))
    }
}
