//! Evidence manifest: the resolved artifact locations of one case.
//!
//! # Module Structure
//!
//! - [`table`] - the fixed artifact key table
//! - [`resolver`] - glob resolution against an extracted case tree

pub mod resolver;
pub mod table;

pub use resolver::{find_ios_version, resolve};
pub use table::{ArtifactSpec, Cardinality, EntryKind, ARTIFACTS};

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CaseError, CaseResult};
use crate::files::atomic;

/// Resolved value of one artifact key.
///
/// List keys always hold a (possibly empty) sequence; scalar keys hold a path
/// or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactValue {
    List(Vec<PathBuf>),
    Path(Option<PathBuf>),
}

impl ArtifactValue {
    /// Resolved paths as a slice: one element for a resolved scalar.
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            ArtifactValue::List(paths) => paths,
            ArtifactValue::Path(Some(path)) => std::slice::from_ref(path),
            ArtifactValue::Path(None) => &[],
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.paths().is_empty()
    }
}

/// iOS version as a semantic triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IosVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl IosVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for IosVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for IosVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(format!("expected major.minor.patch, got '{}'", s));
        }
        let number = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| format!("invalid version component '{}' in '{}'", part, s))
        };
        Ok(Self::new(number(parts[0])?, number(parts[1])?, number(parts[2])?))
    }
}

impl Serialize for IosVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IosVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Mapping of the artifact key table to resolved paths for one case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceManifest {
    #[serde(flatten)]
    pub artifacts: BTreeMap<String, ArtifactValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_version: Option<IosVersion>,
}

impl EvidenceManifest {
    /// Value of a key, `None` when the key is not in the manifest at all.
    pub fn get(&self, key: &str) -> Option<&ArtifactValue> {
        self.artifacts.get(key)
    }

    /// Resolved paths of a key; empty when absent or unresolved.
    pub fn paths(&self, key: &str) -> &[PathBuf] {
        self.get(key).map(ArtifactValue::paths).unwrap_or(&[])
    }

    /// Number of keys that resolved to at least one path.
    pub fn resolved_count(&self) -> usize {
        self.artifacts.values().filter(|v| v.is_resolved()).count()
    }

    pub fn load(path: &Path) -> CaseResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CaseError::io(format!("reading manifest {}", path.display()), e))?;
        serde_json::from_str(&contents)
            .map_err(|e| CaseError::json(format!("manifest {}", path.display()), e))
    }

    /// Replace the manifest document wholesale.
    pub fn save(&self, path: &Path) -> CaseResult<()> {
        atomic::write_json(path, self)
    }
}
