//! Plugin contract for parsers and analyzers.
//!
//! Plugins are plain trait objects registered into a [`PluginRegistry`].
//! Parsers turn raw artifacts into a [`StructuredResult`]; analyzers read a
//! case's parsed outputs and write one derived file.
//!
//! # Module Structure
//!
//! - [`registry`] - validation, ordering and lookup of registered plugins
//! - [`parsers`] - built-in parsers
//! - [`analyzers`] - built-in analyzers

pub mod analyzers;
pub mod parsers;
pub mod registry;

pub use registry::PluginRegistry;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::manifest::IosVersion;

/// Ordered JSON object produced by a parser, written verbatim.
pub type StructuredResult = serde_json::Map<String, serde_json::Value>;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// The two plugin families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Parser,
    Analyzer,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Parser => "parser",
            PluginKind::Analyzer => "analyzer",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a single plugin invocation.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{0}")]
    Failed(String),

    /// A parser returned no result.
    #[error("no result produced")]
    NoResult,

    /// An analyzer finished with a non-zero status.
    #[error("exited with status {0}")]
    Status(i32),

    /// A parsed file the analyzer depends on is absent.
    #[error("required parsed output '{0}' is missing")]
    MissingInput(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PluginError {
    pub fn failed(reason: impl Into<String>) -> Self {
        PluginError::Failed(reason.into())
    }
}

/// Extracts structured data from one artifact key.
///
/// Implementors must be thread-safe; a registry is shared by every worker.
pub trait Parser: Send + Sync {
    /// Unique, file-name-safe name; also the output file stem
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;

    /// Artifact key whose resolved paths are handed to [`Parser::parse`]
    fn input_key(&self) -> &str;

    /// Parse the resolved artifact paths.
    ///
    /// A scalar artifact arrives as a one-element slice. `Ok(None)` means the
    /// parser could not produce a result and is treated as a failure; an
    /// empty map is a valid result.
    fn parse(
        &self,
        paths: &[PathBuf],
        ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>>;
}

/// Derives one output file from a case's parsed outputs.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;

    /// Extension of the output file, without the dot
    fn output_extension(&self) -> &str;

    /// Read `parsed_dir` and write the result to `output`.
    ///
    /// Returns a status: `0` is success, anything else a failure.
    fn analyze(&self, parsed_dir: &Path, output: &Path) -> PluginResult<i32>;
}

/// Registration metadata of a plugin, as listed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub kind: PluginKind,
    pub description: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_extension: Option<String>,
}

impl PluginDescriptor {
    pub fn of_parser(parser: &dyn Parser) -> Self {
        Self {
            name: parser.name().to_string(),
            kind: PluginKind::Parser,
            description: parser.description().to_string(),
            version: parser.version().to_string(),
            input_key: Some(parser.input_key().to_string()),
            output_extension: None,
        }
    }

    pub fn of_analyzer(analyzer: &dyn Analyzer) -> Self {
        Self {
            name: analyzer.name().to_string(),
            kind: PluginKind::Analyzer,
            description: analyzer.description().to_string(),
            version: analyzer.version().to_string(),
            input_key: None,
            output_extension: Some(analyzer.output_extension().to_string()),
        }
    }

    /// Input key for parsers, output extension for analyzers.
    pub fn io_hint(&self) -> &str {
        self.input_key
            .as_deref()
            .or(self.output_extension.as_deref())
            .unwrap_or("")
    }
}
