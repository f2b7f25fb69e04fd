//! Command handlers for the sysdiagnose CLI.
//!
//! Each submodule handles a specific CLI command or command group.
//! The main dispatch logic remains in main.rs.

pub mod analyze;
pub mod clear;
pub mod config;
pub mod init;
pub mod list;
pub mod parse;
pub mod status;

use anyhow::{Context, Result};

use sysdiagnose::cli::RunArgs;
use sysdiagnose::{AppPaths, CaseRegistry, Config, PluginStatus, RunOptions, RunReport};

/// How a command finished, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Interrupted,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure => 1,
            Outcome::Interrupted => 130,
        }
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Directory layout and registry for the configured storage directory.
pub fn open_storage(config: &Config) -> Result<(AppPaths, CaseRegistry)> {
    let paths = config.app_paths();
    paths
        .ensure()
        .with_context(|| format!("Failed to prepare {}", paths.root().display()))?;
    let registry = CaseRegistry::open(paths.cases_file()).context("Failed to open case registry")?;
    Ok((paths, registry))
}

/// Merge `parse`/`analyze` flags over the `[pipeline]` config section.
pub fn run_options(config: &Config, args: &RunArgs) -> RunOptions {
    let mut options = RunOptions::from_config(config).ignore_errors(args.ignore_errors);
    if let Some(workers) = args.workers {
        options = options.workers(workers);
    }
    if let Some(secs) = args.timeout {
        let timeout = (secs > 0).then(|| std::time::Duration::from_secs(secs));
        options = options.timeout(timeout);
    }
    options
}

/// Print one line per plugin and turn the report into an outcome.
pub fn report_outcome(report: &RunReport) -> Outcome {
    let width = report
        .outcomes
        .iter()
        .map(|o| o.name.chars().count())
        .max()
        .unwrap_or(0);

    for outcome in &report.outcomes {
        let line = format!("  {:<width$}  {}", outcome.name, outcome.status, width = width);
        match outcome.status {
            PluginStatus::Succeeded { .. } | PluginStatus::NotRun => println!("{}", line),
            PluginStatus::Skipped { .. } | PluginStatus::Failed { .. } => eprintln!("{}", line),
        }
    }

    println!(
        "{} {}(s) on case {}: {} succeeded, {} skipped, {} failed, {} not run",
        report.outcomes.len(),
        report.kind,
        report.case_id,
        report.count("succeeded"),
        report.count("skipped"),
        report.count("failed"),
        report.count("not run"),
    );

    if report.interrupted {
        eprintln!("Interrupted: no further {}s were started.", report.kind);
        return Outcome::Interrupted;
    }
    if let Some(error) = &report.aborted {
        eprintln!("Error: {}", error);
        return Outcome::Failure;
    }
    if report.is_success() {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}
