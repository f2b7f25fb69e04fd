//! Built-in parsers.

mod accessibility_tcc;
mod appinstallation;
mod brctl;
mod mobile_activation;
mod ps;
mod shutdownlog;
mod sqlite;

pub use accessibility_tcc::AccessibilityTccParser;
pub use appinstallation::AppInstallationParser;
pub use brctl::BrctlParser;
pub use mobile_activation::MobileActivationParser;
pub use ps::PsParser;
pub use shutdownlog::ShutdownLogParser;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::{Parser, PluginError, PluginResult};

/// Every built-in parser, in registration order.
pub fn builtin() -> Vec<Arc<dyn Parser>> {
    vec![
        Arc::new(PsParser),
        Arc::new(BrctlParser),
        Arc::new(MobileActivationParser),
        Arc::new(ShutdownLogParser),
        Arc::new(AccessibilityTccParser),
        Arc::new(AppInstallationParser),
    ]
}

/// Read a text artifact, replacing invalid UTF-8.
pub(crate) fn read_text(path: &Path) -> PluginResult<String> {
    let bytes = fs::read(path).map_err(|e| {
        PluginError::failed(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The single path of a scalar artifact.
pub(crate) fn single(paths: &[std::path::PathBuf]) -> PluginResult<&Path> {
    match paths {
        [path] => Ok(path),
        [] => Err(PluginError::failed("no input path")),
        _ => Err(PluginError::failed(format!(
            "expected one input path, got {}",
            paths.len()
        ))),
    }
}
