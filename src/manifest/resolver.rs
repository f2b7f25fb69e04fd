//! Resolve the artifact table against an extracted case directory.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;
use walkdir::WalkDir;

use super::table::{ArtifactSpec, Cardinality, EntryKind, ARTIFACTS, SYSDIAGNOSE_LOG};
use super::{ArtifactValue, EvidenceManifest, IosVersion};
use crate::error::{CaseError, CaseResult};

/// One entry of the extracted tree.
struct TreeEntry {
    /// Path relative to the case directory, `/`-separated
    relative: String,
    path: PathBuf,
    kind: EntryKind,
}

/// Build the evidence manifest for an extracted case directory.
///
/// Scalar keys take the lexicographically first match; list keys take all
/// matches in lexicographic order. Every key of the table is present in the
/// result.
pub fn resolve(case_dir: &Path) -> CaseResult<EvidenceManifest> {
    let tree = scan_tree(case_dir)?;

    let mut artifacts = BTreeMap::new();
    for spec in ARTIFACTS {
        let matcher = build_matcher(spec)?;
        let mut matches: Vec<PathBuf> = tree
            .iter()
            .filter(|entry| entry.kind == spec.kind && matcher.is_match(&entry.relative))
            .map(|entry| entry.path.clone())
            .collect();
        matches.sort();
        matches.dedup();

        let value = match spec.cardinality {
            Cardinality::List => ArtifactValue::List(matches),
            Cardinality::Single => ArtifactValue::Path(matches.into_iter().next()),
        };
        tracing::trace!(key = spec.key, resolved = value.is_resolved(), "resolved artifact");
        artifacts.insert(spec.key.to_string(), value);
    }

    let ios_version = match artifacts.get(SYSDIAGNOSE_LOG).and_then(|v| v.paths().first()) {
        Some(log) => find_ios_version(log)?,
        None => None,
    };

    Ok(EvidenceManifest {
        artifacts,
        ios_version,
    })
}

/// Scan a log file line by line for the first `iPhone OS x.y.z` banner.
pub fn find_ios_version(log_path: &Path) -> CaseResult<Option<IosVersion>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"iPhone OS (\d+)\.(\d+)\.(\d+)").expect("Version pattern should be valid")
    });

    let file = File::open(log_path)
        .map_err(|e| CaseError::io(format!("opening {}", log_path.display()), e))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| CaseError::io(format!("reading {}", log_path.display()), e))?;
        if read == 0 {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&line);
        if let Some(caps) = pattern.captures(&text) {
            let version = format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]);
            // Components too large for u32 are not a version we can use
            if let Ok(version) = version.parse() {
                return Ok(Some(version));
            }
        }
    }
}

fn scan_tree(case_dir: &Path) -> CaseResult<Vec<TreeEntry>> {
    let root = fs::canonicalize(case_dir)
        .map_err(|e| CaseError::io(format!("resolving {}", case_dir.display()), e))?;
    let mut entries = Vec::new();
    for entry in WalkDir::new(case_dir).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            let context = format!("scanning {}", case_dir.display());
            match e.into_io_error() {
                Some(io) => CaseError::io(context, io),
                None => CaseError::Extraction(format!("{}: filesystem loop", context)),
            }
        })?;

        // In-tree links resolve to their target's kind; dangling ones match nothing
        let path = entry.path();
        if entry.path_is_symlink() {
            match fs::canonicalize(path) {
                Ok(target) if target.starts_with(&root) => {}
                Ok(target) => {
                    tracing::warn!(link = %path.display(), target = %target.display(), "ignoring link that leaves the case directory");
                    continue;
                }
                Err(_) => continue,
            }
        }
        let kind = if path.is_dir() {
            EntryKind::Dir
        } else if path.is_file() {
            EntryKind::File
        } else {
            continue;
        };

        let Ok(relative) = path.strip_prefix(case_dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        entries.push(TreeEntry {
            relative,
            path: path.to_path_buf(),
            kind,
        });
    }
    Ok(entries)
}

fn build_matcher(spec: &ArtifactSpec) -> CaseResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in spec.patterns {
        builder.add(compile(pattern)?);
    }
    builder
        .build()
        .map_err(|e| CaseError::Extraction(format!("artifact '{}': {}", spec.key, e)))
}

fn compile(pattern: &str) -> CaseResult<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| CaseError::Extraction(format!("invalid pattern '{}': {}", pattern, e)))
}
