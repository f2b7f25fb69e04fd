//! Analyzer orchestration: parsed outputs in, `analyzed_data/<case_id>/<name>.<ext>` out.
//!
//! Each analyzer writes to a private `<output>.<pid>-<n>.tmp`. A zero status
//! moves it into place; any other outcome removes it, so a failed analyzer
//! never replaces a good earlier output. A timed-out analyzer may still write
//! its staging file after that, so leftovers are swept when the next run starts.

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
use crate::plugin::{Analyzer, PluginError, PluginKind, PluginRegistry};
use crate::registry::CaseRegistry;

/// Runs analyzers against a case's parsed outputs.
pub struct AnalyzeOrchestrator<'a> {
    paths: &'a AppPaths,
    registry: &'a CaseRegistry,
    plugins: &'a PluginRegistry,
    interrupt: Option<InterruptFlag>,
}

impl<'a> AnalyzeOrchestrator<'a> {
    pub fn new(paths: &'a AppPaths, registry: &'a CaseRegistry, plugins: &'a PluginRegistry) -> Self {
        Self {
            paths,
            registry,
            plugins,
            interrupt: None,
        }
    }

    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Run the selected analyzers (all of them for `None`) over one case.
    pub fn run(
        &self,
        case_id: &str,
        names: Option<&[String]>,
        options: &RunOptions,
    ) -> CaseResult<RunReport> {
        let selection =
            runner::select(self.plugins, PluginKind::Analyzer, names, options.ignore_errors)?;
        // Registered cases only; the record itself is not needed
        self.registry.get(case_id)?;
        let _case_lock = lock::acquire(&self.paths.case_data_dir(case_id))?;

        let parsed_dir = self.paths.case_parsed_dir(case_id);
        let output_dir = self.paths.case_analyzed_dir(case_id);
        fs::create_dir_all(&output_dir)
            .map_err(|e| CaseError::io(format!("creating {}", output_dir.display()), e))?;
        remove_stale_staging(&output_dir);

        tracing::info!(
            case_id,
            analyzers = selection.names.len(),
            ignore_errors = options.ignore_errors,
            "starting analyze run"
        );

        let planned = selection
            .names
            .into_iter()
            .map(|(name, _)| {
                let task = match self.plugins.analyzer(&name) {
                    Some(analyzer) => Ok(analyzer_task(
                        analyzer,
                        &parsed_dir,
                        &output_dir,
                        options.timeout,
                    )),
                    None => Err("unknown analyzer".to_string()),
                };
                Planned { name, task }
            })
            .collect();

        let report = runner::run_all(
            case_id,
            PluginKind::Analyzer,
            planned,
            options,
            self.interrupt.as_ref(),
        );
        tracing::info!(
            case_id,
            succeeded = report.count("succeeded"),
            skipped = report.count("skipped"),
            "analyze run finished"
        );
        Ok(report)
    }
}

fn analyzer_task<'t>(
    analyzer: Arc<dyn Analyzer>,
    parsed_dir: &'t Path,
    output_dir: &'t Path,
    timeout: Option<Duration>,
) -> Task<'t> {
    Box::new(move || {
        let name = analyzer.name().to_string();
        let output = output_dir.join(format!("{}.{}", name, analyzer.output_extension()));
        let staging = atomic::unique_temp_path_for(&output);

        let plugin = Arc::clone(&analyzer);
        let input: PathBuf = parsed_dir.to_path_buf();
        let target = staging.clone();
        tracing::debug!(analyzer = %name, "invoking analyzer");
        let status = runner::invoke_isolated(&name, timeout, move || {
            plugin.analyze(&input, &target)
        })
        .and_then(|status| match status {
            0 if staging.is_file() => Ok(()),
            0 => Err(PluginError::failed("no output written")),
            other => Err(PluginError::Status(other)),
        });

        if let Err(e) = status {
            let _ = fs::remove_file(&staging);
            return Err(runner::execution_error(PluginKind::Analyzer, &name, e));
        }

        atomic::commit(&staging, &output).map_err(|e| CaseError::PluginExecution {
            kind: PluginKind::Analyzer,
            plugin: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(output)
    })
}

/// Delete `*.tmp` files left by analyzers that outlived an earlier run.
fn remove_stale_staging(output_dir: &Path) {
    let Ok(entries) = fs::read_dir(output_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tmp") && path.is_file() {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(file = %path.display(), "removed stale staging file"),
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "failed to remove stale staging file"),
            }
        }
    }
}
