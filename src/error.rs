//! Error taxonomy for case operations.
//!
//! `CaseError` is returned by the library components (ingestion, registry,
//! orchestrators). Command handlers wrap it with `anyhow` context.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::plugin::PluginKind;

/// Result type for case operations.
pub type CaseResult<T> = Result<T, CaseError>;

/// Errors raised while ingesting, resolving, or processing a case.
#[derive(Debug, Error)]
pub enum CaseError {
    /// The archive does not exist or cannot be read.
    #[error("'{}' not found", .0.display())]
    NotFound(PathBuf),

    /// No case with this id is registered.
    #[error("case '{0}' not found")]
    CaseNotFound(String),

    #[error(
        "this archive has already been extracted (case id: {case_id}), \
         to re-extract, use the '-f' or '--force' option"
    )]
    AlreadyIngested { case_id: String },

    #[error("cannot open archive '{}': {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    /// Extraction failed, including entries that would escape the case directory.
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("parser '{plugin}' input '{key}' is not available")]
    ArtifactMissing { plugin: String, key: String },

    #[error("{kind} '{plugin}' failed: {reason}")]
    PluginExecution {
        kind: PluginKind,
        plugin: String,
        reason: String,
    },

    #[error("case registry '{}' is malformed: {reason}", path.display())]
    RegistryCorruption { path: PathBuf, reason: String },

    #[error("invalid {kind}(s): [ {} ]", names.join(", "))]
    InvalidSelection { kind: PluginKind, names: Vec<String> },

    /// Another live process holds the advisory lock.
    #[error("'{}' is locked by process {pid}", path.display())]
    Locked { path: PathBuf, pid: u32 },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON error in {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CaseError {
    /// Wrap an IO error with a short description of the failed operation.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        CaseError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(what: impl Into<String>, source: serde_json::Error) -> Self {
        CaseError::Json {
            what: what.into(),
            source,
        }
    }
}
