//! Durable case registry.
//!
//! The registry is a single JSON document, `{"cases": {"<case_id>": {...}}}`,
//! and is the only source of truth for which cases exist. Every update is a
//! whole-document read-modify-write performed under an in-process mutex and
//! an advisory lock file, then written with temp+rename.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CaseError, CaseResult};
use crate::files::{atomic, lock};

/// How long a writer waits for another process's registry update.
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Metadata of one ingested archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Map key in the registry document, not repeated inside the entry
    #[serde(skip)]
    pub case_id: String,
    pub source_file: PathBuf,
    pub source_sha256: String,
    /// Path of the case's evidence manifest
    pub case_file: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    cases: BTreeMap<String, CaseRecord>,
}

/// Registry of cases backed by `cases.json`.
pub struct CaseRegistry {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl CaseRegistry {
    /// Open the registry at `path`, creating an empty document on first use.
    pub fn open(path: impl Into<PathBuf>) -> CaseResult<Self> {
        let registry = Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        };
        if !registry.path.exists() {
            registry.store(&RegistryDocument::default())?;
            tracing::debug!(path = %registry.path.display(), "initialized empty case registry");
        }
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every registered case, keyed by case id.
    pub fn load(&self) -> CaseResult<BTreeMap<String, CaseRecord>> {
        Ok(self.read_document()?.cases)
    }

    /// Look up one case.
    pub fn get(&self, case_id: &str) -> CaseResult<CaseRecord> {
        self.load()?
            .remove(case_id)
            .ok_or_else(|| CaseError::CaseNotFound(case_id.to_string()))
    }

    pub fn contains(&self, case_id: &str) -> CaseResult<bool> {
        Ok(self.load()?.contains_key(case_id))
    }

    /// Insert or replace a case record.
    pub fn put(&self, record: &CaseRecord) -> CaseResult<()> {
        self.update(|doc| {
            doc.cases.insert(record.case_id.clone(), record.clone());
        })
    }

    /// Forget every case.
    pub fn reset(&self) -> CaseResult<()> {
        self.update(|doc| doc.cases.clear())
    }

    fn update(&self, mutate: impl FnOnce(&mut RegistryDocument)) -> CaseResult<()> {
        // A poisoned mutex only means another writer panicked; the file itself
        // is still consistent thanks to temp+rename.
        let _in_process = self
            .write_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _on_disk = lock::acquire_within(&self.path, LOCK_TIMEOUT)?;

        let mut doc = self.read_document()?;
        mutate(&mut doc);
        self.store(&doc)
    }

    fn read_document(&self) -> CaseResult<RegistryDocument> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(RegistryDocument::default())
            }
            Err(e) => {
                return Err(CaseError::io(
                    format!("reading case registry {}", self.path.display()),
                    e,
                ))
            }
        };

        let mut doc: RegistryDocument =
            serde_json::from_str(&contents).map_err(|e| CaseError::RegistryCorruption {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        for (case_id, record) in doc.cases.iter_mut() {
            record.case_id = case_id.clone();
        }
        Ok(doc)
    }

    fn store(&self, doc: &RegistryDocument) -> CaseResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CaseError::io(format!("creating {}", parent.display()), e))?;
        }
        atomic::write_json(&self.path, doc)
    }
}
