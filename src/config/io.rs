//! Configuration I/O operations

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use super::types::Config;

/// Get the config file path (~/.config/sysdiagnose/config.toml)
pub fn config_path() -> Result<PathBuf> {
    let config_dir = config_dir()?;
    Ok(config_dir.join("config.toml"))
}

/// Get the config directory path (~/.config/sysdiagnose)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("sysdiagnose"))
}

/// Load configuration from file, or return defaults if not found
pub fn load() -> Result<Config> {
    let config_path = config_path()?;

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        parse(&contents).with_context(|| format!("Failed to parse config file: {:?}", config_path))
    } else {
        Ok(Config::default())
    }
}

/// Parse and validate configuration from TOML text
pub fn parse(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    if config.pipeline.workers == 0 {
        anyhow::bail!("Invalid config: pipeline.workers must be at least 1");
    }
    config
        .logging
        .level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| anyhow::anyhow!("Invalid config: unknown log level '{}'", config.logging.level))?;
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    let config_path = config_path()?;

    // Ensure config directory exists
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&config_path, contents)
        .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

    Ok(())
}
