//! Config subcommands handler

use anyhow::{Context, Result};

use sysdiagnose::Config;

use super::Outcome;

/// Show the effective configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(config: &Config) -> Result<Outcome> {
    let toml_str = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("# {}", Config::config_path()?.display());
    print!("{}", toml_str);
    Ok(Outcome::Success)
}

/// Write the default configuration file unless one exists.
#[cfg(not(tarpaulin_include))]
pub fn handle_init() -> Result<Outcome> {
    let config_path = Config::config_path()?;
    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
        return Ok(Outcome::Success);
    }
    Config::default().save()?;
    println!("Wrote default config to {}", config_path.display());
    Ok(Outcome::Success)
}
