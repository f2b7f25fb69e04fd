//! Archive ingestion: fingerprint, dedup, extract, resolve, register.
//!
//! # Module Structure
//!
//! - [`digest`] - streamed SHA-256 and case ids
//! - [`extract`] - confined tar / tar.gz extraction

pub mod digest;
pub mod extract;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppPaths;
use crate::error::{CaseError, CaseResult};
use crate::files::lock;
use crate::manifest;
use crate::registry::{CaseRecord, CaseRegistry};

/// Turns archives into registered cases.
pub struct Ingestor<'a> {
    paths: &'a AppPaths,
    registry: &'a CaseRegistry,
}

impl<'a> Ingestor<'a> {
    pub fn new(paths: &'a AppPaths, registry: &'a CaseRegistry) -> Self {
        Self { paths, registry }
    }

    /// Ingest an archive and return its case record.
    ///
    /// Without `force`, an archive whose fingerprint is already registered is
    /// rejected before anything on disk is touched. With `force`, the tree and
    /// manifest are rebuilt while the case id and digest stay the same. Nothing
    /// is registered unless every step succeeded.
    pub fn ingest(&self, archive_path: &Path, force: bool) -> CaseResult<CaseRecord> {
        let source_file = canonical_archive(archive_path)?;

        let source_sha256 = digest::sha256_file(&source_file)?;
        let case_id = digest::case_id_for(&source_sha256);
        tracing::debug!(case_id = %case_id, archive = %source_file.display(), "fingerprinted archive");

        if self.registry.contains(&case_id)? {
            if !force {
                return Err(CaseError::AlreadyIngested { case_id });
            }
            tracing::info!(case_id = %case_id, "re-ingesting existing case");
        }

        self.paths.ensure()?;
        let case_dir = self.paths.case_data_dir(&case_id);
        let _case_lock = lock::acquire(&case_dir)?;

        let entries = extract::verify(&source_file)?;
        tracing::debug!(case_id = %case_id, entries, "archive verified");

        let staging = self.staging_dir(&case_id);
        remove_dir_if_exists(&staging)?;
        let summary = extract::extract(&source_file, &staging)?;
        if summary.skipped > 0 {
            tracing::warn!(
                case_id = %case_id,
                skipped = summary.skipped,
                "archive entries of unsupported type were not extracted"
            );
        }

        self.swap_in(&case_id, &staging, &case_dir)?;

        let manifest = manifest::resolve(&case_dir)?;
        match manifest.ios_version {
            Some(version) => tracing::info!(case_id = %case_id, ios_version = %version, "detected iOS version"),
            None => tracing::warn!(case_id = %case_id, "could not determine iOS version"),
        }

        let case_file = self.paths.case_manifest(&case_id);
        manifest.save(&case_file)?;

        let parsed_dir = self.paths.case_parsed_dir(&case_id);
        fs::create_dir_all(&parsed_dir)
            .map_err(|e| CaseError::io(format!("creating {}", parsed_dir.display()), e))?;

        let record = CaseRecord {
            case_id,
            source_file,
            source_sha256,
            case_file,
        };
        self.registry.put(&record)?;

        tracing::info!(
            case_id = %record.case_id,
            resolved = manifest.resolved_count(),
            unpacked = summary.unpacked,
            "case ingested"
        );
        Ok(record)
    }

    fn staging_dir(&self, case_id: &str) -> PathBuf {
        self.paths.data_dir().join(format!(".{}.staging", case_id))
    }

    fn previous_dir(&self, case_id: &str) -> PathBuf {
        self.paths.data_dir().join(format!(".{}.previous", case_id))
    }

    /// Replace `case_dir` with the finished `staging` tree.
    ///
    /// An existing tree is moved aside first and only deleted once the new one
    /// is in place; if the swap fails it is moved back.
    fn swap_in(&self, case_id: &str, staging: &Path, case_dir: &Path) -> CaseResult<()> {
        let previous = self.previous_dir(case_id);
        remove_dir_if_exists(&previous)?;
        let had_previous = case_dir.exists();
        if had_previous {
            fs::rename(case_dir, &previous).map_err(|e| {
                let _ = fs::remove_dir_all(staging);
                CaseError::io(format!("moving aside {}", case_dir.display()), e)
            })?;
        }

        if let Err(e) = fs::rename(staging, case_dir) {
            let _ = fs::remove_dir_all(staging);
            if had_previous {
                if let Err(restore) = fs::rename(&previous, case_dir) {
                    tracing::error!(case_id, error = %restore, "failed to restore previous case tree");
                }
            }
            return Err(CaseError::io(
                format!("moving extraction into {}", case_dir.display()),
                e,
            ));
        }

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&previous) {
                tracing::warn!(dir = %previous.display(), error = %e, "failed to remove previous case tree");
            }
        }
        Ok(())
    }
}

fn canonical_archive(archive_path: &Path) -> CaseResult<PathBuf> {
    let not_found = || CaseError::NotFound(archive_path.to_path_buf());
    let metadata = fs::metadata(archive_path).map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }
    fs::canonicalize(archive_path).map_err(|_| not_found())
}

fn remove_dir_if_exists(dir: &Path) -> CaseResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .map_err(|e| CaseError::io(format!("removing {}", dir.display()), e))?;
    }
    Ok(())
}
