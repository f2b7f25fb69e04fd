//! Parse and analyze orchestration over a registered case.
//!
//! Both orchestrators share the same shape: validate the selection, take the
//! per-case lock, run each selected plugin in isolation, and collect a
//! [`RunReport`] with one status per plugin.
//!
//! # Failure modes
//!
//! - fail-fast (default): the first plugin error aborts the run, the plugins
//!   after it are reported as not run
//! - `ignore_errors`: plugin errors are logged and recorded as skipped, the
//!   remaining plugins still run
//!
//! # Module Structure
//!
//! - [`parse`] - parser orchestration
//! - [`analyze`] - analyzer orchestration
//! - `runner` - plugin isolation, selection and the worker pool

pub mod analyze;
pub mod parse;
mod runner;

pub use analyze::AnalyzeOrchestrator;
pub use parse::ParseOrchestrator;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::error::CaseError;
use crate::plugin::PluginKind;

/// Options controlling a parse or analyze run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Record plugin failures as skipped instead of aborting
    pub ignore_errors: bool,
    /// Wall-clock limit per plugin, `None` for unlimited
    pub timeout: Option<Duration>,
    /// Pool size; only used together with `ignore_errors`
    pub workers: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            timeout: None,
            workers: 1,
        }
    }
}

impl RunOptions {
    /// Options seeded from the `[pipeline]` config section.
    pub fn from_config(config: &Config) -> Self {
        Self {
            ignore_errors: false,
            timeout: config.plugin_timeout(),
            workers: config.pipeline.workers.max(1),
        }
    }

    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Whether plugins may run concurrently.
    ///
    /// Fail-fast runs stay sequential so an abort happens before any later
    /// plugin starts.
    pub fn is_parallel(&self) -> bool {
        self.ignore_errors && self.workers > 1
    }
}

/// Final status of one selected plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginStatus {
    Succeeded { output: PathBuf },
    /// Failed or unknown, tolerated under `ignore_errors`
    Skipped { reason: String },
    /// Failed and aborted the run
    Failed { reason: String },
    NotRun,
}

impl PluginStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PluginStatus::Succeeded { .. } => "succeeded",
            PluginStatus::Skipped { .. } => "skipped",
            PluginStatus::Failed { .. } => "failed",
            PluginStatus::NotRun => "not run",
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, PluginStatus::Succeeded { .. })
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginStatus::Succeeded { output } => {
                write!(f, "succeeded ({})", output.display())
            }
            PluginStatus::Skipped { reason } => write!(f, "skipped: {}", reason),
            PluginStatus::Failed { reason } => write!(f, "failed: {}", reason),
            PluginStatus::NotRun => f.write_str("not run"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOutcome {
    pub name: String,
    pub status: PluginStatus,
}

/// Per-plugin results of one orchestrator run.
#[derive(Debug)]
pub struct RunReport {
    pub case_id: String,
    pub kind: PluginKind,
    /// One entry per selected plugin, in selection order
    pub outcomes: Vec<PluginOutcome>,
    /// The error that stopped a fail-fast run
    pub aborted: Option<CaseError>,
    /// An interrupt was requested while the run was in progress
    pub interrupted: bool,
}

impl RunReport {
    /// True when every plugin succeeded or was skipped under `ignore_errors`.
    pub fn is_success(&self) -> bool {
        self.aborted.is_none()
            && !self.interrupted
            && self.outcomes.iter().all(|o| {
                matches!(
                    o.status,
                    PluginStatus::Succeeded { .. } | PluginStatus::Skipped { .. }
                )
            })
    }

    pub fn status_of(&self, name: &str) -> Option<&PluginStatus> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.status)
    }

    pub fn count(&self, label: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.label() == label)
            .count()
    }
}
