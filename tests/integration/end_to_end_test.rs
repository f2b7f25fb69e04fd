//! Full case lifecycle through the library API

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use sysdiagnose::ingest::digest;
use sysdiagnose::{
    AnalyzeOrchestrator, CaseError, Ingestor, IosVersion, ParseOrchestrator, Parser,
    PluginRegistry, PluginResult, PluginStatus, RunOptions, StructuredResult,
};

use crate::helpers::{sample_archive, Workspace};

/// Counts its input paths.
struct Counting {
    name: &'static str,
    key: &'static str,
}

impl Parser for Counting {
    fn name(&self) -> &str {
        self.name
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn description(&self) -> &str {
        "Count input paths"
    }
    fn input_key(&self) -> &str {
        self.key
    }
    fn parse(
        &self,
        paths: &[PathBuf],
        _ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>> {
        let mut result = StructuredResult::new();
        result.insert("paths".to_string(), paths.len().into());
        Ok(Some(result))
    }
}

/// P1 and P3 have inputs, P2 reads an artifact the sample does not contain.
fn p1_p2_p3() -> PluginRegistry {
    let mut plugins = PluginRegistry::new();
    for (name, key) in [("p1", "ps"), ("p2", "spindump-nosymbols"), ("p3", "shutdownlog")] {
        plugins.register_parser(Arc::new(Counting { name, key }));
    }
    plugins
}

#[test]
fn fingerprint_is_deterministic() {
    let ws = Workspace::new();
    let first = sample_archive(ws.dir.path(), "a.tar.gz", true);
    let second = sample_archive(ws.dir.path(), "b.tar.gz", true);
    // Same bytes under another name is the same case
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    let sha = digest::sha256_file(&first).unwrap();
    assert_eq!(sha.len(), 64);
    assert_eq!(sha, digest::sha256_file(&second).unwrap());
    assert_eq!(digest::case_id_for(&sha), &sha[..8]);
}

#[test]
fn rejected_duplicate_leaves_state_untouched() {
    let ws = Workspace::new();
    let archive = sample_archive(ws.dir.path(), "sample.tar.gz", true);
    let ingestor = Ingestor::new(&ws.paths, &ws.registry);
    let record = ingestor.ingest(&archive, false).unwrap();

    let registry_before = fs::read(ws.paths.cases_file()).unwrap();
    let manifest_before = fs::read(&record.case_file).unwrap();
    let case_dir = ws.paths.case_data_dir(&record.case_id);
    let entries_before: Vec<_> = walk(&case_dir);

    assert!(matches!(
        ingestor.ingest(&archive, false),
        Err(CaseError::AlreadyIngested { .. })
    ));
    assert_eq!(fs::read(ws.paths.cases_file()).unwrap(), registry_before);
    assert_eq!(fs::read(&record.case_file).unwrap(), manifest_before);
    assert_eq!(walk(&case_dir), entries_before);
}

fn walk(dir: &std::path::Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut entries: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
        .collect();
    entries.sort();
    entries
}

#[test]
fn partial_failure_fail_fast() {
    let ws = Workspace::new();
    let case = ws.ingest_sample();
    let plugins = p1_p2_p3();

    let report = ParseOrchestrator::new(&ws.paths, &ws.registry, &plugins)
        .run(&case.case_id, None, &RunOptions::default())
        .unwrap();

    assert!(report.status_of("p1").unwrap().is_succeeded());
    assert!(matches!(
        report.aborted,
        Some(CaseError::ArtifactMissing { ref plugin, .. }) if plugin == "p2"
    ));
    assert_eq!(report.status_of("p3"), Some(&PluginStatus::NotRun));

    let parsed = ws.paths.case_parsed_dir(&case.case_id);
    assert!(parsed.join("p1.json").is_file());
    assert!(!parsed.join("p3.json").exists());
}

#[test]
fn partial_failure_ignore_errors() {
    let ws = Workspace::new();
    let case = ws.ingest_sample();
    let plugins = p1_p2_p3();

    let report = ParseOrchestrator::new(&ws.paths, &ws.registry, &plugins)
        .run(&case.case_id, None, &RunOptions::default().ignore_errors(true))
        .unwrap();

    assert!(report.is_success());
    assert!(matches!(report.status_of("p2"), Some(PluginStatus::Skipped { .. })));

    let parsed = ws.paths.case_parsed_dir(&case.case_id);
    assert!(parsed.join("p1.json").is_file());
    assert!(!parsed.join("p2.json").exists());
    assert!(parsed.join("p3.json").is_file());
}

#[test]
fn ingest_parse_analyze_builtin() {
    let ws = Workspace::new();
    let case = ws.ingest_sample();
    let plugins = PluginRegistry::builtin();
    let options = RunOptions::default().ignore_errors(true).workers(4);

    let parsed = ParseOrchestrator::new(&ws.paths, &ws.registry, &plugins)
        .run(&case.case_id, None, &options)
        .unwrap();
    assert_eq!(parsed.count("succeeded"), 6, "{:?}", parsed.outcomes);

    let shutdowns: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(ws.paths.case_parsed_dir(&case.case_id).join("shutdownlog.json"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(shutdowns["shutdowns"][0]["clients"][0]["pid"], 12);

    let activation: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(
            ws.paths
                .case_parsed_dir(&case.case_id)
                .join("mobile_activation.json"),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(activation["files"], 2);
    assert_eq!(activation["events"].as_array().unwrap().len(), 4);

    let analyzed = AnalyzeOrchestrator::new(&ws.paths, &ws.registry, &plugins)
        .run(&case.case_id, None, &options)
        .unwrap();
    assert_eq!(analyzed.count("succeeded"), 2, "{:?}", analyzed.outcomes);
}

#[test]
fn forced_reingest_keeps_identity() {
    let ws = Workspace::new();
    let archive = sample_archive(ws.dir.path(), "sample.tar.gz", true);
    let ingestor = Ingestor::new(&ws.paths, &ws.registry);
    let first = ingestor.ingest(&archive, false).unwrap();

    let moved = ws.dir.path().join("moved.tar.gz");
    fs::rename(&archive, &moved).unwrap();
    let second = ingestor.ingest(&moved, true).unwrap();

    assert_eq!(second.case_id, first.case_id);
    assert_eq!(second.source_sha256, first.source_sha256);
    assert_eq!(second.source_file, fs::canonicalize(&moved).unwrap());
    assert_eq!(ws.registry.get(&first.case_id).unwrap(), second);
}
