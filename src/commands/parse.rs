//! Parse command handler

use anyhow::{Context, Result};

use sysdiagnose::cli::RunArgs;
use sysdiagnose::{Config, InterruptFlag, ParseOrchestrator, PluginRegistry};

use super::{open_storage, report_outcome, run_options, Outcome};

/// Run the selected parsers on a case.
#[cfg(not(tarpaulin_include))]
pub fn handle(
    config: &Config,
    plugins: &PluginRegistry,
    interrupt: &InterruptFlag,
    args: &RunArgs,
) -> Result<Outcome> {
    let (paths, registry) = open_storage(config)?;
    let options = run_options(config, args);

    let report = ParseOrchestrator::new(&paths, &registry, plugins)
        .with_interrupt(interrupt.clone())
        .run(&args.case_id, args.selection(), &options)
        .with_context(|| format!("Failed to parse case {}", args.case_id))?;

    Ok(report_outcome(&report))
}
