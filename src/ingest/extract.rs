//! Tar / tar.gz extraction with path confinement.
//!
//! Archives are detected by content (gzip magic bytes), never by extension.
//! Every entry path is normalised component by component before anything is
//! written, so no entry can land outside the destination directory. Once the
//! tree is unpacked every symlink is resolved on disk, since a link can climb
//! out through other links even when its own target text stays inside.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tar::{Archive, EntryType};
use walkdir::WalkDir;

use crate::error::{CaseError, CaseResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Counts from a completed extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub unpacked: usize,
    /// Entries of unsupported types (devices, fifos) that were not materialised
    pub skipped: usize,
}

/// Walk every header and entry body without writing anything.
///
/// Returns the number of entries. Unreadable headers, truncated data, gzip
/// errors, and empty archives are reported as `CorruptArchive`.
pub fn verify(archive_path: &Path) -> CaseResult<usize> {
    let corrupt = |reason: String| CaseError::CorruptArchive {
        path: archive_path.to_path_buf(),
        reason,
    };

    let mut archive = open(archive_path)?;
    let mut count = 0;
    for entry in archive.entries().map_err(|e| corrupt(e.to_string()))? {
        let mut entry = entry.map_err(|e| corrupt(e.to_string()))?;
        io::copy(&mut entry, &mut io::sink()).map_err(|e| corrupt(e.to_string()))?;
        count += 1;
    }

    if count == 0 {
        return Err(corrupt("archive contains no entries".to_string()));
    }
    Ok(count)
}

/// Extract `archive_path` into `dest`, which must not exist yet.
///
/// On any error `dest` is removed again, leaving no partial tree behind.
pub fn extract(archive_path: &Path, dest: &Path) -> CaseResult<ExtractSummary> {
    fs::create_dir_all(dest)
        .map_err(|e| CaseError::io(format!("creating {}", dest.display()), e))?;

    match unpack_all(archive_path, dest).and_then(|summary| {
        confine_links(dest)?;
        Ok(summary)
    }) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(dest) {
                tracing::warn!(dir = %dest.display(), error = %cleanup, "failed to remove partial extraction");
            }
            Err(e)
        }
    }
}

fn unpack_all(archive_path: &Path, dest: &Path) -> CaseResult<ExtractSummary> {
    let mut archive = open(archive_path)?;
    archive.set_preserve_permissions(false);
    archive.set_overwrite(true);

    let mut summary = ExtractSummary::default();
    let entries = archive
        .entries()
        .map_err(|e| CaseError::Extraction(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| CaseError::Extraction(e.to_string()))?;
        let raw = entry
            .path()
            .map_err(|e| CaseError::Extraction(e.to_string()))?
            .into_owned();

        let Some(relative) = sanitize(&raw).map_err(CaseError::Extraction)? else {
            continue;
        };

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Regular
            | EntryType::Continuous
            | EntryType::GNUSparse
            | EntryType::Directory => {}
            EntryType::Symlink => {
                let target = link_target(&entry, &raw)?;
                if !symlink_stays_inside(&relative, &target) {
                    return Err(CaseError::Extraction(format!(
                        "link '{}' points outside the case directory",
                        raw.display()
                    )));
                }
            }
            EntryType::Link => {
                let target = link_target(&entry, &raw)?;
                if sanitize(&target).map_err(CaseError::Extraction)?.is_none() {
                    return Err(CaseError::Extraction(format!(
                        "hard link '{}' has an empty target",
                        raw.display()
                    )));
                }
            }
            other => {
                tracing::debug!(entry = %raw.display(), kind = ?other, "skipping unsupported entry");
                summary.skipped += 1;
                continue;
            }
        }

        let unpacked = entry.unpack_in(dest).map_err(|e| {
            CaseError::Extraction(format!("unpacking '{}': {}", raw.display(), e))
        })?;
        if !unpacked {
            return Err(CaseError::Extraction(format!(
                "entry '{}' escapes the case directory",
                raw.display()
            )));
        }
        summary.unpacked += 1;
    }

    Ok(summary)
}

/// Fail if any symlink under `dest` resolves to a location outside it.
///
/// Dangling links are left alone; they resolve to nothing.
pub(crate) fn confine_links(dest: &Path) -> CaseResult<()> {
    let root = fs::canonicalize(dest)
        .map_err(|e| CaseError::io(format!("resolving {}", dest.display()), e))?;

    for entry in WalkDir::new(dest).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| CaseError::Extraction(e.to_string()))?;
        if !entry.path_is_symlink() {
            continue;
        }
        let Ok(resolved) = fs::canonicalize(entry.path()) else {
            continue;
        };
        if !resolved.starts_with(&root) {
            let shown = entry.path().strip_prefix(dest).unwrap_or(entry.path());
            return Err(CaseError::Extraction(format!(
                "link '{}' resolves outside the case directory",
                shown.display()
            )));
        }
    }
    Ok(())
}

fn open(archive_path: &Path) -> CaseResult<Archive<Box<dyn Read>>> {
    let file = File::open(archive_path)
        .map_err(|e| CaseError::io(format!("opening {}", archive_path.display()), e))?;
    let mut reader = BufReader::new(file);
    let head = reader
        .fill_buf()
        .map_err(|e| CaseError::io(format!("reading {}", archive_path.display()), e))?;

    let stream: Box<dyn Read> = if head.starts_with(&GZIP_MAGIC) {
        Box::new(MultiGzDecoder::new(reader))
    } else {
        Box::new(reader)
    };
    Ok(Archive::new(stream))
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>, raw: &Path) -> CaseResult<PathBuf> {
    entry
        .link_name()
        .map_err(|e| CaseError::Extraction(e.to_string()))?
        .map(|target| target.into_owned())
        .ok_or_else(|| {
            CaseError::Extraction(format!("link '{}' has no target", raw.display()))
        })
}

/// Normalise an entry path to a relative path inside the destination.
///
/// Returns `Ok(None)` for entries that name the destination itself (`./`),
/// and an error for absolute paths or any `..` component.
pub(crate) fn sanitize(path: &Path) -> Result<Option<PathBuf>, String> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("entry '{}' contains '..'", path.display()))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("entry '{}' is an absolute path", path.display()))
            }
        }
    }
    Ok((!clean.as_os_str().is_empty()).then_some(clean))
}

/// Whether a symlink at `link` (relative to the destination) pointing to
/// `target` resolves inside the destination.
pub(crate) fn symlink_stays_inside(link: &Path, target: &Path) -> bool {
    if target.has_root() {
        return false;
    }

    let mut depth: Vec<Component<'_>> = link
        .parent()
        .map(|parent| parent.components().collect())
        .unwrap_or_default();
    for component in target.components() {
        match component {
            Component::Normal(_) => depth.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth.pop().is_none() {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}
