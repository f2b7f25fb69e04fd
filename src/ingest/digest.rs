//! Content fingerprint of an archive.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{CaseError, CaseResult};

/// Length of a case id in hex characters.
pub const CASE_ID_LEN: usize = 8;

/// Streamed SHA-256 of a file, lowercase hex.
pub fn sha256_file(path: &Path) -> CaseResult<String> {
    let mut file =
        File::open(path).map_err(|e| CaseError::io(format!("opening {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| CaseError::io(format!("hashing {}", path.display()), e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Case id for a full hex digest.
pub fn case_id_for(digest: &str) -> String {
    digest.chars().take(CASE_ID_LEN).collect()
}
