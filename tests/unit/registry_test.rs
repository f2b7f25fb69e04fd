//! Unit tests for the case registry

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use sysdiagnose::{CaseError, CaseRecord, CaseRegistry};
use tempfile::TempDir;

fn record(case_id: &str) -> CaseRecord {
    CaseRecord {
        case_id: case_id.to_string(),
        source_file: PathBuf::from(format!("/evidence/{}.tar.gz", case_id)),
        source_sha256: format!("{}{}", case_id, "0".repeat(56)),
        case_file: PathBuf::from(format!("/app/data/{}.json", case_id)),
    }
}

#[test]
fn open_creates_empty_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cases.json");
    let registry = CaseRegistry::open(&path).unwrap();
    assert!(path.exists());
    assert!(registry.load().unwrap().is_empty());
    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(doc["cases"].as_object().unwrap().is_empty());
}

#[test]
fn put_then_get_keeps_case_id_as_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cases.json");
    let registry = CaseRegistry::open(&path).unwrap();
    registry.put(&record("1a2b3c4d")).unwrap();

    assert_eq!(registry.get("1a2b3c4d").unwrap(), record("1a2b3c4d"));
    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(doc["cases"]["1a2b3c4d"].get("case_id").is_none());
    assert_eq!(doc["cases"]["1a2b3c4d"]["source_file"], "/evidence/1a2b3c4d.tar.gz");
}

#[test]
fn get_unknown_case_fails() {
    let dir = TempDir::new().unwrap();
    let registry = CaseRegistry::open(dir.path().join("cases.json")).unwrap();
    assert!(matches!(
        registry.get("ffffffff"),
        Err(CaseError::CaseNotFound(id)) if id == "ffffffff"
    ));
    assert!(!registry.contains("ffffffff").unwrap());
}

#[test]
fn reset_forgets_every_case() {
    let dir = TempDir::new().unwrap();
    let registry = CaseRegistry::open(dir.path().join("cases.json")).unwrap();
    registry.put(&record("aaaaaaaa")).unwrap();
    registry.put(&record("bbbbbbbb")).unwrap();
    registry.reset().unwrap();
    assert!(registry.load().unwrap().is_empty());
}

#[test]
fn malformed_document_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cases.json");
    fs::write(&path, "{ not json").unwrap();
    let registry = CaseRegistry::open(&path).unwrap();
    assert!(matches!(
        registry.load(),
        Err(CaseError::RegistryCorruption { .. })
    ));
}

#[test]
fn concurrent_puts_are_all_kept() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(CaseRegistry::open(dir.path().join("cases.json")).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.put(&record(&format!("{:08x}", i))).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.load().unwrap().len(), 8);
}

#[test]
fn no_temp_file_left_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cases.json");
    let registry = CaseRegistry::open(&path).unwrap();
    registry.put(&record("1a2b3c4d")).unwrap();
    assert!(!dir.path().join("cases.json.tmp").exists());
    assert!(!dir.path().join("cases.json.lock").exists());
}
