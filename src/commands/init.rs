//! Init command handler

use anyhow::{Context, Result};
use std::path::Path;

use sysdiagnose::{Config, EvidenceManifest, Ingestor};

use super::{open_storage, Outcome};

/// Ingest an archive and print the resulting case.
#[cfg(not(tarpaulin_include))]
pub fn handle(config: &Config, archive: &Path, force: bool) -> Result<Outcome> {
    let (paths, registry) = open_storage(config)?;
    let record = Ingestor::new(&paths, &registry)
        .ingest(archive, force)
        .with_context(|| format!("Failed to ingest {}", archive.display()))?;

    let manifest = EvidenceManifest::load(&record.case_file)?;
    println!("Case {} ready", record.case_id);
    println!("  source:    {}", record.source_file.display());
    println!("  sha256:    {}", record.source_sha256);
    println!(
        "  artifacts: {} of {} resolved",
        manifest.resolved_count(),
        manifest.artifacts.len()
    );
    match manifest.ios_version {
        Some(version) => println!("  iOS:       {}", version),
        None => println!("  iOS:       unknown"),
    }
    Ok(Outcome::Success)
}
