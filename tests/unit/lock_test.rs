use std::path::Path;
use std::time::Duration;

use sysdiagnose::files::lock;
use sysdiagnose::CaseError;
use tempfile::TempDir;

#[test]
fn lock_path_for_appends_lock_extension() {
    let path = Path::new("/app/data/1a2b3c4d");
    assert_eq!(lock::lock_path_for(path), Path::new("/app/data/1a2b3c4d.lock"));
}

#[test]
fn acquire_records_own_pid() {
    let dir = TempDir::new().unwrap();
    let case_dir = dir.path().join("1a2b3c4d");
    let _guard = lock::acquire(&case_dir).unwrap();
    let info = lock::read_lock(&case_dir).unwrap();
    assert_eq!(info.pid, std::process::id());
}

#[test]
fn second_acquire_is_refused_while_held() {
    let dir = TempDir::new().unwrap();
    let case_dir = dir.path().join("1a2b3c4d");
    let _guard = lock::acquire(&case_dir).unwrap();
    match lock::acquire(&case_dir) {
        Err(CaseError::Locked { pid, .. }) => assert_eq!(pid, std::process::id()),
        other => panic!("expected Locked, got {:?}", other),
    }
}

#[test]
fn dropping_guard_releases_lock() {
    let dir = TempDir::new().unwrap();
    let case_dir = dir.path().join("1a2b3c4d");
    let guard = lock::acquire(&case_dir).unwrap();
    let lock_path = guard.lock_path().to_path_buf();
    assert!(lock_path.exists());
    drop(guard);
    assert!(!lock_path.exists());
    assert!(lock::acquire(&case_dir).is_ok());
}

#[test]
fn stale_lock_is_reclaimed() {
    let dir = TempDir::new().unwrap();
    let case_dir = dir.path().join("stale");
    std::fs::write(
        lock::lock_path_for(&case_dir),
        r#"{"pid":999999999,"started":"2025-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    assert!(lock::read_lock(&case_dir).is_none());
    assert!(lock::acquire(&case_dir).is_ok());
}

#[test]
fn acquire_within_gives_up_after_timeout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cases.json");
    let _guard = lock::acquire(&path).unwrap();
    let result = lock::acquire_within(&path, Duration::from_millis(120));
    assert!(matches!(result, Err(CaseError::Locked { .. })));
}

#[test]
fn fresh_empty_lock_counts_as_held() {
    let dir = TempDir::new().unwrap();
    let case_dir = dir.path().join("1a2b3c4d");
    // A writer that created the file but has not filled it in yet
    std::fs::write(lock::lock_path_for(&case_dir), "").unwrap();
    assert!(matches!(
        lock::acquire(&case_dir),
        Err(CaseError::Locked { .. })
    ));
    assert!(lock::lock_path_for(&case_dir).exists());
}

#[test]
fn guard_keeps_lock_it_no_longer_owns() {
    let dir = TempDir::new().unwrap();
    let case_dir = dir.path().join("1a2b3c4d");
    let guard = lock::acquire(&case_dir).unwrap();
    let lock_path = guard.lock_path().to_path_buf();

    let other = format!(
        r#"{{"pid":{},"started":"2030-01-01T00:00:00Z"}}"#,
        std::process::id()
    );
    std::fs::write(&lock_path, &other).unwrap();
    drop(guard);

    assert_eq!(std::fs::read_to_string(&lock_path).unwrap(), other);
}
