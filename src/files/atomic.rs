//! Crash-safe file replacement.
//!
//! Writers go to a sibling temp file which is renamed over the target, so a
//! reader sees either the old document or the new one, never a torn write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CaseError, CaseResult};

/// Get the temp path used while replacing `path`.
///
/// The temp path is the original path with `.tmp` appended.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}

/// A temp path for `path` that no other writer in any process will pick.
///
/// Shaped `<path>.<pid>-<n>.tmp`, so it still ends in `.tmp`.
pub fn unique_temp_path_for(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let mut temp = path.as_os_str().to_owned();
    temp.push(format!(
        ".{}-{}.tmp",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    PathBuf::from(temp)
}

/// Atomically replace `path` with `contents`.
pub fn write(path: &Path, contents: &[u8]) -> CaseResult<()> {
    let temp_path = temp_path_for(path);

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        // Clean up temp file on failure
        let _ = fs::remove_file(&temp_path);
        return Err(CaseError::io(format!("writing {}", path.display()), e));
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> CaseResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| CaseError::json(path.display().to_string(), e))?;
    bytes.push(b'\n');
    write(path, &bytes)
}

/// Move a finished staging file into place, removing it on failure.
pub fn commit(staging: &Path, path: &Path) -> CaseResult<()> {
    if let Err(e) = fs::rename(staging, path) {
        let _ = fs::remove_file(staging);
        return Err(CaseError::io(format!("replacing {}", path.display()), e));
    }
    Ok(())
}
