//! sysdiagnose case pipeline library
//!
//! Ingests iOS sysdiagnose archives as content-addressed cases, resolves the
//! known artifacts inside each extracted tree, and drives parser and analyzer
//! plugins over them.

pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod ingest;
pub mod interrupt;
pub mod lifecycle;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod plugin;
pub mod registry;

pub use config::{AppPaths, Config};
pub use error::{CaseError, CaseResult};
pub use ingest::Ingestor;
pub use interrupt::InterruptFlag;
pub use lifecycle::{CaseState, CaseStatus};
pub use manifest::{ArtifactValue, EvidenceManifest, IosVersion};
pub use pipeline::{
    AnalyzeOrchestrator, ParseOrchestrator, PluginOutcome, PluginStatus, RunOptions, RunReport,
};
pub use plugin::{
    Analyzer, Parser, PluginDescriptor, PluginError, PluginKind, PluginRegistry, PluginResult,
    StructuredResult,
};
pub use registry::{CaseRecord, CaseRegistry};
