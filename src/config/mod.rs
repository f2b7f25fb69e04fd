//! Configuration management for sysdiagnose

mod io;
mod paths;
mod types;

pub use paths::AppPaths;
pub use types::*;

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

impl Config {
    /// Get the config file path (~/.config/sysdiagnose/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        io::config_path()
    }

    /// Get the config directory path (~/.config/sysdiagnose)
    pub fn config_dir() -> Result<PathBuf> {
        io::config_dir()
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        io::load()
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        io::parse(contents)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        io::save(self)
    }

    /// Expand ~ in storage directory path
    pub fn storage_directory(&self) -> PathBuf {
        let dir = &self.storage.directory;
        if let Some(stripped) = dir.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
        PathBuf::from(dir)
    }

    /// Directory layout derived from the storage directory
    pub fn app_paths(&self) -> AppPaths {
        AppPaths::new(self.storage_directory())
    }

    /// Per-plugin timeout, `None` when disabled
    pub fn plugin_timeout(&self) -> Option<Duration> {
        match self.pipeline.plugin_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
