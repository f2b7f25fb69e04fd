//! List command handler

use anyhow::{Context, Result};

use sysdiagnose::cli::ListTarget;
use sysdiagnose::{Config, PluginDescriptor, PluginKind, PluginRegistry};

use super::{open_storage, truncate_string, Outcome};

/// List cases, parsers or analyzers as a table.
#[cfg(not(tarpaulin_include))]
pub fn handle(config: &Config, plugins: &PluginRegistry, what: ListTarget) -> Result<Outcome> {
    match what {
        ListTarget::Cases => list_cases(config)?,
        ListTarget::Parsers => print_plugins(&plugins.discover(PluginKind::Parser), "Input"),
        ListTarget::Analyzers => print_plugins(&plugins.discover(PluginKind::Analyzer), "Output"),
    }
    Ok(Outcome::Success)
}

fn list_cases(config: &Config) -> Result<()> {
    let (_paths, registry) = open_storage(config)?;
    let cases = registry.load().context("Failed to read case registry")?;

    if cases.is_empty() {
        println!("No cases. Ingest an archive with: sysdiagnose init <ARCHIVE>");
        return Ok(());
    }

    println!("{:<10} {:<18} Source", "Case ID", "SHA-256");
    for record in cases.values() {
        println!(
            "{:<10} {:<18} {}",
            record.case_id,
            truncate_string(&record.source_sha256, 18),
            truncate_string(&record.source_file.display().to_string(), 60)
        );
    }
    println!("\n{} case(s)", cases.len());
    Ok(())
}

fn print_plugins(descriptors: &[PluginDescriptor], io_header: &str) {
    if descriptors.is_empty() {
        println!("No plugins registered.");
        return;
    }

    let name_width = descriptors
        .iter()
        .map(|d| d.name.len())
        .max()
        .unwrap_or(0)
        .max(4);
    let io_width = descriptors
        .iter()
        .map(|d| d.io_hint().len())
        .max()
        .unwrap_or(0)
        .max(io_header.len());

    println!(
        "{:<nw$}  {:<8}  {:<iw$}  Description",
        "Name",
        "Version",
        io_header,
        nw = name_width,
        iw = io_width
    );
    for d in descriptors {
        println!(
            "{:<nw$}  {:<8}  {:<iw$}  {}",
            d.name,
            d.version,
            d.io_hint(),
            truncate_string(&d.description, 50),
            nw = name_width,
            iw = io_width
        );
    }
}
