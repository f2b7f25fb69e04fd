//! Shared machinery of the orchestrators.
//!
//! - `select` validates requested plugin names against the registry
//! - `invoke_isolated` runs one plugin call on its own thread, catching
//!   panics and enforcing the timeout
//! - `run_all` drives the planned tasks sequentially or on a rayon pool

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;

use super::{PluginOutcome, PluginStatus, RunOptions, RunReport};
use crate::error::{CaseError, CaseResult};
use crate::interrupt::InterruptFlag;
use crate::plugin::{PluginError, PluginKind, PluginRegistry, PluginResult};

/// Work for one selected plugin; returns the path of the written output.
pub(crate) type Task<'a> = Box<dyn Fn() -> CaseResult<PathBuf> + Send + Sync + 'a>;

/// A selected name and what to do with it.
pub(crate) struct Planned<'a> {
    pub name: String,
    /// `Err` holds the reason an unknown name is skipped
    pub task: Result<Task<'a>, String>,
}

/// Names to run, in order, each flagged as known or not.
pub(crate) struct Selection {
    pub names: Vec<(String, bool)>,
}

/// Validate a requested selection.
///
/// `None` selects every registered plugin of `kind` in registration order.
/// Unknown names fail the whole selection unless `ignore_errors` is set, in
/// which case they are kept and marked unknown.
pub(crate) fn select(
    plugins: &PluginRegistry,
    kind: PluginKind,
    requested: Option<&[String]>,
    ignore_errors: bool,
) -> CaseResult<Selection> {
    let Some(requested) = requested else {
        return Ok(Selection {
            names: plugins.names(kind).into_iter().map(|n| (n, true)).collect(),
        });
    };

    let mut names: Vec<(String, bool)> = Vec::new();
    for name in requested {
        if names.iter().any(|(seen, _)| seen == name) {
            continue;
        }
        names.push((name.clone(), plugins.contains(kind, name)));
    }

    let unknown: Vec<String> = names
        .iter()
        .filter(|(_, known)| !known)
        .map(|(name, _)| name.clone())
        .collect();
    if !unknown.is_empty() {
        if !ignore_errors {
            return Err(CaseError::InvalidSelection {
                kind,
                names: unknown,
            });
        }
        for name in &unknown {
            tracing::error!(kind = %kind, plugin = %name, "unknown plugin, skipping");
        }
    }
    Ok(Selection { names })
}

/// Run `call` on a dedicated thread.
///
/// A panic becomes `PluginError::Panicked`. When `timeout` elapses first the
/// thread is left to finish on its own and `PluginError::Timeout` is returned.
pub(crate) fn invoke_isolated<T, F>(
    name: &str,
    timeout: Option<Duration>,
    call: F,
) -> PluginResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> PluginResult<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("plugin-{}", name))
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(call));
            // The receiver is gone after a timeout
            let _ = tx.send(outcome);
        })
        .map_err(PluginError::Io)?;

    let received = match timeout {
        Some(limit) => rx.recv_timeout(limit).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => PluginError::Timeout(limit),
            mpsc::RecvTimeoutError::Disconnected => {
                PluginError::Panicked("plugin thread exited without a result".to_string())
            }
        })?,
        None => rx.recv().map_err(|_| {
            PluginError::Panicked("plugin thread exited without a result".to_string())
        })?,
    };

    match received {
        Ok(result) => result,
        Err(payload) => Err(PluginError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Execute planned tasks and aggregate their outcomes.
pub(crate) fn run_all(
    case_id: &str,
    kind: PluginKind,
    planned: Vec<Planned<'_>>,
    options: &RunOptions,
    interrupt: Option<&InterruptFlag>,
) -> RunReport {
    let mut report = RunReport {
        case_id: case_id.to_string(),
        kind,
        outcomes: Vec::with_capacity(planned.len()),
        aborted: None,
        interrupted: false,
    };

    if options.is_parallel() && planned.len() > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .build()
        {
            Ok(pool) => {
                tracing::debug!(workers = options.workers, "running plugins in parallel");
                let statuses: Vec<(PluginStatus, bool)> = pool.install(|| {
                    planned
                        .par_iter()
                        .map(|plan| {
                            if interrupt.is_some_and(InterruptFlag::is_set) {
                                return (PluginStatus::NotRun, true);
                            }
                            (skip_on_error(kind, plan), false)
                        })
                        .collect()
                });
                for (plan, (status, interrupted)) in planned.iter().zip(statuses) {
                    report.interrupted |= interrupted;
                    report.outcomes.push(PluginOutcome {
                        name: plan.name.clone(),
                        status,
                    });
                }
                note_late_interrupt(&mut report, interrupt);
                return report;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to build worker pool, running sequentially");
            }
        }
    }

    let mut remaining = planned.iter();
    for plan in remaining.by_ref() {
        if interrupt.is_some_and(InterruptFlag::is_set) {
            tracing::warn!(kind = %kind, "interrupted, not starting further plugins");
            report.interrupted = true;
            report.outcomes.push(not_run(plan));
            break;
        }

        if options.ignore_errors {
            let status = skip_on_error(kind, plan);
            report.outcomes.push(PluginOutcome {
                name: plan.name.clone(),
                status,
            });
            continue;
        }

        match &plan.task {
            Ok(task) => match task() {
                Ok(output) => report.outcomes.push(succeeded(kind, plan, output)),
                Err(e) => {
                    tracing::error!(kind = %kind, plugin = %plan.name, error = %e, "aborting run");
                    report.outcomes.push(PluginOutcome {
                        name: plan.name.clone(),
                        status: PluginStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                    report.aborted = Some(e);
                    break;
                }
            },
            // Unknown names are rejected up front in fail-fast mode
            Err(reason) => report.outcomes.push(PluginOutcome {
                name: plan.name.clone(),
                status: PluginStatus::Skipped {
                    reason: reason.clone(),
                },
            }),
        }
    }
    report.outcomes.extend(remaining.map(not_run));
    note_late_interrupt(&mut report, interrupt);
    report
}

/// A signal that arrived while the last plugins were running still counts.
fn note_late_interrupt(report: &mut RunReport, interrupt: Option<&InterruptFlag>) {
    if !report.interrupted && interrupt.is_some_and(InterruptFlag::is_set) {
        tracing::warn!(kind = %report.kind, "interrupted while plugins were running");
        report.interrupted = true;
    }
}

/// Run one task, converting any error into a skipped status.
fn skip_on_error(kind: PluginKind, plan: &Planned<'_>) -> PluginStatus {
    let task = match &plan.task {
        Ok(task) => task,
        Err(reason) => {
            return PluginStatus::Skipped {
                reason: reason.clone(),
            }
        }
    };
    match task() {
        Ok(output) => succeeded(kind, plan, output).status,
        Err(e) => {
            tracing::error!(kind = %kind, plugin = %plan.name, error = %e, "plugin failed, skipping");
            PluginStatus::Skipped {
                reason: e.to_string(),
            }
        }
    }
}

fn succeeded(kind: PluginKind, plan: &Planned<'_>, output: PathBuf) -> PluginOutcome {
    tracing::info!(kind = %kind, plugin = %plan.name, output = %output.display(), "plugin succeeded");
    PluginOutcome {
        name: plan.name.clone(),
        status: PluginStatus::Succeeded { output },
    }
}

fn not_run(plan: &Planned<'_>) -> PluginOutcome {
    PluginOutcome {
        name: plan.name.clone(),
        status: PluginStatus::NotRun,
    }
}

/// Map a plugin-level error to the orchestrator error for `plugin`.
pub(crate) fn execution_error(kind: PluginKind, plugin: &str, error: PluginError) -> CaseError {
    CaseError::PluginExecution {
        kind,
        plugin: plugin.to_string(),
        reason: error.to_string(),
    }
}
