//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Application directory holding the registry, logs and case trees
    #[serde(default = "default_directory")]
    pub directory: String,
}

pub fn default_directory() -> String {
    "~/.local/share/sysdiagnose".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

/// Parse/analyze pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads used when plugin errors are ignored (1 = sequential)
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Wall-clock limit per plugin invocation, 0 disables the limit
    #[serde(default = "default_plugin_timeout")]
    pub plugin_timeout_secs: u64,
}

pub fn default_workers() -> usize {
    1
}

pub fn default_plugin_timeout() -> u64 {
    300
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            plugin_timeout_secs: default_plugin_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Console level (error, warn, info, debug, trace)
    #[serde(default = "default_level")]
    pub level: String,
    /// Also write a debug log to `<storage>/app.log`
    #[serde(default = "default_file_logging")]
    pub file: bool,
}

pub fn default_level() -> String {
    "info".to_string()
}

pub fn default_file_logging() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_file_logging(),
        }
    }
}
