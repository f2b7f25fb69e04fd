//! Application directory layout.
//!
//! Every component receives an `AppPaths` instead of reaching for a global,
//! so tests can point the whole pipeline at a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CaseError, CaseResult};

/// Locations of the registry, logs and per-case trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extracted archives and manifests (`data/`)
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Parser outputs (`parsed_data/`)
    pub fn parsed_dir(&self) -> PathBuf {
        self.root.join("parsed_data")
    }

    /// Analyzer outputs (`analyzed_data/`)
    pub fn analyzed_dir(&self) -> PathBuf {
        self.root.join("analyzed_data")
    }

    /// The case registry document
    pub fn cases_file(&self) -> PathBuf {
        self.root.join("cases.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("app.log")
    }

    /// Extracted tree of one case (`data/<case_id>/`)
    pub fn case_data_dir(&self, case_id: &str) -> PathBuf {
        self.data_dir().join(case_id)
    }

    /// Manifest document of one case (`data/<case_id>.json`)
    pub fn case_manifest(&self, case_id: &str) -> PathBuf {
        self.data_dir().join(format!("{}.json", case_id))
    }

    pub fn case_parsed_dir(&self, case_id: &str) -> PathBuf {
        self.parsed_dir().join(case_id)
    }

    pub fn case_analyzed_dir(&self, case_id: &str) -> PathBuf {
        self.analyzed_dir().join(case_id)
    }

    /// Create the directory skeleton if it does not exist yet.
    pub fn ensure(&self) -> CaseResult<()> {
        for dir in [
            self.root.clone(),
            self.data_dir(),
            self.parsed_dir(),
            self.analyzed_dir(),
        ] {
            fs::create_dir_all(&dir)
                .map_err(|e| CaseError::io(format!("creating {}", dir.display()), e))?;
        }
        Ok(())
    }
}
