//! Clear command handler

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::Path;

use sysdiagnose::Config;

use super::{open_storage, Outcome};

const PROMPT: &str = "This will erase all the app cache, including the extracted, parsed and \
analyzed data. Are you sure you want to proceed? [y/n]: ";

/// Delete every case after confirmation.
#[cfg(not(tarpaulin_include))]
pub fn handle(config: &Config, yes: bool) -> Result<Outcome> {
    if !yes {
        let stdin = io::stdin();
        if !confirm(&mut stdin.lock(), &mut io::stdout())? {
            println!("Aborted, nothing was deleted.");
            return Ok(Outcome::Success);
        }
    }

    let (paths, registry) = open_storage(config)?;
    registry.reset().context("Failed to reset case registry")?;
    for dir in [paths.data_dir(), paths.parsed_dir(), paths.analyzed_dir()] {
        remove_contents(&dir)?;
    }
    File::create(paths.log_file())
        .with_context(|| format!("Failed to truncate {}", paths.log_file().display()))?;

    tracing::info!(root = %paths.root().display(), "app cache cleared");
    println!("App cache cleared.");
    Ok(Outcome::Success)
}

/// Ask until a yes/no answer is given. End of input counts as no.
fn confirm(input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "ye" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => writeln!(output, "'{}' is not a valid choice.", other)?,
        }
    }
}

fn remove_contents(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to recreate {}", dir.display()))?;
    Ok(())
}
