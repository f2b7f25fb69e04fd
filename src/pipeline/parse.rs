//! Parser orchestration: manifest artifacts in, `parsed_data/<case_id>/*.json` out.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::runner::{self, Planned, Task};
use super::{RunOptions, RunReport};
use crate::config::AppPaths;
use crate::error::{CaseError, CaseResult};
use crate::files::{atomic, lock};
use crate::interrupt::InterruptFlag;
use crate::manifest::EvidenceManifest;
use crate::plugin::{Parser, PluginError, PluginKind, PluginRegistry};
use crate::registry::CaseRegistry;

/// Runs parsers against a case's evidence manifest.
pub struct ParseOrchestrator<'a> {
    paths: &'a AppPaths,
    registry: &'a CaseRegistry,
    plugins: &'a PluginRegistry,
    interrupt: Option<InterruptFlag>,
}

impl<'a> ParseOrchestrator<'a> {
    pub fn new(paths: &'a AppPaths, registry: &'a CaseRegistry, plugins: &'a PluginRegistry) -> Self {
        Self {
            paths,
            registry,
            plugins,
            interrupt: None,
        }
    }

    /// Stop starting new parsers once `flag` is set.
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Run the selected parsers (all of them for `None`) over one case.
    ///
    /// Errors returned here happen before any parser starts. Plugin failures
    /// are reported per plugin in the [`RunReport`].
    pub fn run(
        &self,
        case_id: &str,
        names: Option<&[String]>,
        options: &RunOptions,
    ) -> CaseResult<RunReport> {
        let selection = runner::select(self.plugins, PluginKind::Parser, names, options.ignore_errors)?;
        // Unknown ids are rejected before they are used in a lock path
        self.registry.get(case_id)?;
        // Held before the record and manifest are read so a forced re-ingest is never seen half-way
        let _case_lock = lock::acquire(&self.paths.case_data_dir(case_id))?;
        let record = self.registry.get(case_id)?;
        let manifest = EvidenceManifest::load(&record.case_file)?;

        let output_dir = self.paths.case_parsed_dir(case_id);
        fs::create_dir_all(&output_dir)
            .map_err(|e| CaseError::io(format!("creating {}", output_dir.display()), e))?;

        tracing::info!(
            case_id,
            parsers = selection.names.len(),
            ignore_errors = options.ignore_errors,
            "starting parse run"
        );

        let planned = selection
            .names
            .into_iter()
            .map(|(name, _)| {
                let task = match self.plugins.parser(&name) {
                    Some(parser) => Ok(parser_task(parser, &manifest, &output_dir, options.timeout)),
                    None => Err("unknown parser".to_string()),
                };
                Planned { name, task }
            })
            .collect();

        let report = runner::run_all(
            case_id,
            PluginKind::Parser,
            planned,
            options,
            self.interrupt.as_ref(),
        );
        tracing::info!(
            case_id,
            succeeded = report.count("succeeded"),
            skipped = report.count("skipped"),
            "parse run finished"
        );
        Ok(report)
    }
}

fn parser_task<'t>(
    parser: Arc<dyn Parser>,
    manifest: &'t EvidenceManifest,
    output_dir: &'t Path,
    timeout: Option<Duration>,
) -> Task<'t> {
    Box::new(move || {
        let name = parser.name().to_string();
        let key = parser.input_key().to_string();
        let inputs: Vec<PathBuf> = manifest.paths(&key).to_vec();
        if inputs.is_empty() {
            return Err(CaseError::ArtifactMissing { plugin: name, key });
        }

        let ios_version = manifest.ios_version;
        let plugin = Arc::clone(&parser);
        tracing::debug!(parser = %name, inputs = inputs.len(), "invoking parser");
        let result = runner::invoke_isolated(&name, timeout, move || {
            plugin.parse(&inputs, ios_version.as_ref())
        })
        .and_then(|result| result.ok_or(PluginError::NoResult))
        .map_err(|e| runner::execution_error(PluginKind::Parser, &name, e))?;

        let output = output_dir.join(format!("{}.json", name));
        atomic::write_json(&output, &result).map_err(|e| CaseError::PluginExecution {
            kind: PluginKind::Parser,
            plugin: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(output)
    })
}
