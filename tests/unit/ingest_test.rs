//! Unit tests for archive ingestion

use std::fs;

use sysdiagnose::ingest::{digest, extract};
use sysdiagnose::{CaseError, EvidenceManifest, Ingestor, IosVersion};

use crate::helpers::{
    chained_link_archive, sample_archive, sample_entries, traversal_archive, write_tar, Workspace,
    ROOT,
};

#[test]
fn ingest_registers_case_with_content_address() {
    let ws = Workspace::new();
    let archive = sample_archive(ws.dir.path(), "sample.tar.gz", true);
    let record = Ingestor::new(&ws.paths, &ws.registry)
        .ingest(&archive, false)
        .unwrap();

    let sha = digest::sha256_file(&archive).unwrap();
    assert_eq!(record.source_sha256, sha);
    assert_eq!(record.case_id, &sha[..8]);
    assert_eq!(record.source_file, fs::canonicalize(&archive).unwrap());
    assert_eq!(record.case_file, ws.paths.case_manifest(&record.case_id));
    assert_eq!(ws.registry.get(&record.case_id).unwrap(), record);
}

#[test]
fn ingest_extracts_and_resolves() {
    let ws = Workspace::new();
    let record = ws.ingest_sample();
    let case_dir = ws.paths.case_data_dir(&record.case_id);

    assert!(case_dir.join(ROOT).join("ps.txt").is_file());
    assert!(ws.paths.case_parsed_dir(&record.case_id).is_dir());

    let manifest = EvidenceManifest::load(&record.case_file).unwrap();
    assert_eq!(manifest.paths("ps"), [case_dir.join(ROOT).join("ps.txt")]);
    assert_eq!(manifest.paths("mobile_activation").len(), 2);
    assert_eq!(manifest.ios_version, Some(IosVersion::new(17, 2, 1)));
}

#[test]
fn plain_tar_is_accepted() {
    let ws = Workspace::new();
    let archive = sample_archive(ws.dir.path(), "sample.tar", false);
    let record = Ingestor::new(&ws.paths, &ws.registry)
        .ingest(&archive, false)
        .unwrap();
    assert!(ws.paths.case_data_dir(&record.case_id).join(ROOT).is_dir());
}

#[test]
fn second_ingest_is_rejected_without_force() {
    let ws = Workspace::new();
    let archive = sample_archive(ws.dir.path(), "sample.tar.gz", true);
    let ingestor = Ingestor::new(&ws.paths, &ws.registry);
    let record = ingestor.ingest(&archive, false).unwrap();

    match ingestor.ingest(&archive, false) {
        Err(CaseError::AlreadyIngested { case_id }) => assert_eq!(case_id, record.case_id),
        other => panic!("expected AlreadyIngested, got {:?}", other),
    }
}

#[test]
fn force_rebuilds_tree_under_same_id() {
    let ws = Workspace::new();
    let archive = sample_archive(ws.dir.path(), "sample.tar.gz", true);
    let ingestor = Ingestor::new(&ws.paths, &ws.registry);
    let first = ingestor.ingest(&archive, false).unwrap();

    let stray = ws.paths.case_data_dir(&first.case_id).join("stray.txt");
    fs::write(&stray, "left over").unwrap();

    let second = ingestor.ingest(&archive, true).unwrap();
    assert_eq!(second, first);
    assert!(!stray.exists());
    assert_eq!(ws.registry.load().unwrap().len(), 1);

    // Only the swapped-in tree remains; no staging or set-aside copy
    let mut left: Vec<String> = fs::read_dir(ws.paths.data_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec![first.case_id.clone(), format!("{}.json", first.case_id)]);
}

#[test]
fn leftover_set_aside_tree_does_not_block_force() {
    let ws = Workspace::new();
    let archive = sample_archive(ws.dir.path(), "sample.tar.gz", true);
    let ingestor = Ingestor::new(&ws.paths, &ws.registry);
    let first = ingestor.ingest(&archive, false).unwrap();

    let previous = ws.paths.data_dir().join(format!(".{}.previous", first.case_id));
    fs::create_dir_all(previous.join("junk")).unwrap();

    ingestor.ingest(&archive, true).unwrap();
    assert!(!previous.exists());
    assert!(ws.paths.case_data_dir(&first.case_id).join(ROOT).join("ps.txt").is_file());
}

#[test]
fn missing_archive_is_not_found() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("nope.tar.gz");
    assert!(matches!(
        Ingestor::new(&ws.paths, &ws.registry).ingest(&missing, false),
        Err(CaseError::NotFound(_))
    ));
}

#[test]
fn directory_is_not_an_archive() {
    let ws = Workspace::new();
    assert!(matches!(
        Ingestor::new(&ws.paths, &ws.registry).ingest(ws.dir.path(), false),
        Err(CaseError::NotFound(_))
    ));
}

#[test]
fn garbage_file_is_corrupt_and_leaves_nothing() {
    let ws = Workspace::new();
    let archive = ws.dir.path().join("garbage.tar.gz");
    fs::write(&archive, [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad]).unwrap();

    let result = Ingestor::new(&ws.paths, &ws.registry).ingest(&archive, false);
    assert!(matches!(result, Err(CaseError::CorruptArchive { .. })));
    assert!(ws.registry.load().unwrap().is_empty());
    assert_eq!(fs::read_dir(ws.paths.data_dir()).unwrap().count(), 0);
}

#[test]
fn empty_tar_is_corrupt() {
    let ws = Workspace::new();
    let archive = ws.dir.path().join("empty.tar");
    write_tar(&archive, &[], false);
    assert!(matches!(
        extract::verify(&archive),
        Err(CaseError::CorruptArchive { .. })
    ));
}

#[test]
fn traversal_entry_aborts_extraction() {
    let ws = Workspace::new();
    let archive = ws.dir.path().join("evil.tar");
    traversal_archive(&archive);

    let result = Ingestor::new(&ws.paths, &ws.registry).ingest(&archive, false);
    assert!(matches!(result, Err(CaseError::Extraction(_))));
    assert!(!ws.paths.data_dir().join("evil.txt").exists());
    assert!(!ws.paths.root().join("evil.txt").exists());
    assert!(ws.registry.load().unwrap().is_empty());
    assert_eq!(fs::read_dir(ws.paths.data_dir()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn chained_links_out_of_the_case_abort_extraction() {
    let ws = Workspace::new();
    let secret = ws.dir.path().join("host_secret.txt");
    fs::write(&secret, "host secret").unwrap();
    let archive = ws.dir.path().join("chained.tar");
    chained_link_archive(&archive, &fs::canonicalize(&secret).unwrap());

    let result = Ingestor::new(&ws.paths, &ws.registry).ingest(&archive, false);
    match result {
        Err(CaseError::Extraction(msg)) => assert!(msg.contains("ps.txt"), "{}", msg),
        other => panic!("expected Extraction error, got {:?}", other),
    }
    assert!(ws.registry.load().unwrap().is_empty());
    assert_eq!(fs::read_dir(ws.paths.data_dir()).unwrap().count(), 0);
    assert_eq!(fs::read_to_string(&secret).unwrap(), "host secret");
}

#[test]
fn extract_counts_unpacked_entries() {
    let dir = tempfile::TempDir::new().unwrap();
    let archive = sample_archive(dir.path(), "sample.tar.gz", true);
    let dest = dir.path().join("out");
    let summary = extract::extract(&archive, &dest).unwrap();
    assert_eq!(summary.unpacked, sample_entries().len());
    assert_eq!(summary.skipped, 0);
}
