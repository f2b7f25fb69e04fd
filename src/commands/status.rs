//! Status command handler

use anyhow::Result;

use sysdiagnose::{CaseState, CaseStatus, Config, PluginRegistry};

use super::{open_storage, Outcome};

/// Show the derived lifecycle state of a case.
#[cfg(not(tarpaulin_include))]
pub fn handle(config: &Config, plugins: &PluginRegistry, case_id: &str) -> Result<Outcome> {
    let (paths, registry) = open_storage(config)?;
    let status = CaseStatus::derive(&paths, &registry, plugins, case_id)?;

    println!("Case {}: {}", status.case_id, status.state);
    if status.state == CaseState::Uninitialized {
        eprintln!("No case with id '{}' has been ingested.", case_id);
        return Ok(Outcome::Failure);
    }

    print_group("Parsed", &status.parsed);
    print_group("Not parsed", &status.unparsed);
    print_group("Analyzed", &status.analyzed);
    print_group("Not analyzed", &status.unanalyzed);
    Ok(Outcome::Success)
}

fn print_group(label: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    println!("  {:<13} {}", format!("{}:", label), names.join(", "));
}
