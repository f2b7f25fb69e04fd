//! Unit tests for plugin registration and the built-in plugins

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use sysdiagnose::plugin::parsers::{
    AccessibilityTccParser, AppInstallationParser, BrctlParser, PsParser,
};
use sysdiagnose::{
    Analyzer, IosVersion, Parser, PluginError, PluginKind, PluginRegistry, PluginResult,
    StructuredResult,
};
use tempfile::TempDir;

use crate::helpers::{sqlite_bytes, APPSTORED_SQL, PS_TXT, TCC_SQL};

struct Candidate {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    key: &'static str,
}

impl Parser for Candidate {
    fn name(&self) -> &str {
        self.name
    }
    fn version(&self) -> &str {
        self.version
    }
    fn description(&self) -> &str {
        self.description
    }
    fn input_key(&self) -> &str {
        self.key
    }
    fn parse(&self, _: &[PathBuf], _: Option<&IosVersion>) -> PluginResult<Option<StructuredResult>> {
        Ok(Some(StructuredResult::new()))
    }
}

struct BadExtension;

impl Analyzer for BadExtension {
    fn name(&self) -> &str {
        "timeline"
    }
    fn version(&self) -> &str {
        "1.0"
    }
    fn description(&self) -> &str {
        "Timeline"
    }
    fn output_extension(&self) -> &str {
        ".json"
    }
    fn analyze(&self, _: &Path, _: &Path) -> PluginResult<i32> {
        Ok(0)
    }
}

fn candidate(name: &'static str, version: &'static str, description: &'static str, key: &'static str) -> Arc<dyn Parser> {
    Arc::new(Candidate {
        name,
        version,
        description,
        key,
    })
}

#[test]
fn complete_candidate_is_registered() {
    let mut registry = PluginRegistry::new();
    assert!(registry.register_parser(candidate("taskinfo", "1.0", "Task info", "taskinfo")));
    assert!(registry.contains(PluginKind::Parser, "taskinfo"));
    assert!(!registry.contains(PluginKind::Analyzer, "taskinfo"));
}

#[test]
fn incomplete_candidates_are_rejected() {
    let mut registry = PluginRegistry::new();
    assert!(!registry.register_parser(candidate("taskinfo", "1.0", "", "taskinfo")));
    assert!(!registry.register_parser(candidate("taskinfo", "", "Task info", "taskinfo")));
    assert!(!registry.register_parser(candidate("task info", "1.0", "Task info", "taskinfo")));
    assert!(!registry.register_parser(candidate("taskinfo", "1.0", "Task info", "no_such_key")));
    assert!(registry.names(PluginKind::Parser).is_empty());
}

#[test]
fn duplicate_name_is_rejected() {
    let mut registry = PluginRegistry::builtin();
    assert!(!registry.register_parser(candidate("ps", "2.0", "Another ps", "ps")));
    assert_eq!(registry.names(PluginKind::Parser).len(), 6);
}

#[test]
fn analyzer_extension_must_be_bare() {
    let mut registry = PluginRegistry::new();
    assert!(!registry.register_analyzer(Arc::new(BadExtension)));
}

#[test]
fn discover_lists_builtin_parsers_with_input_keys() {
    let registry = PluginRegistry::builtin();
    let keys: Vec<String> = registry
        .discover(PluginKind::Parser)
        .into_iter()
        .filter_map(|d| d.input_key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "ps",
            "brctl",
            "mobile_activation",
            "shutdownlog",
            "Accessibility-TCC",
            "appinstallation"
        ]
    );
}

#[test]
fn ps_parser_reads_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ps.txt");
    fs::write(&path, PS_TXT).unwrap();

    let result = PsParser.parse(&[path], None).unwrap().unwrap();
    assert_eq!(result["count"], 3);
    assert_eq!(result["processes"][2]["COMMAND"], "/usr/libexec/backboardd");
}

#[test]
fn ps_parser_fails_on_empty_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ps.txt");
    fs::write(&path, "").unwrap();
    assert!(matches!(
        PsParser.parse(&[path], None),
        Err(PluginError::Failed(_))
    ));
}

#[test]
fn brctl_parser_needs_known_files() {
    let dir = TempDir::new().unwrap();
    let result = BrctlParser.parse(&[dir.path().to_path_buf()], None);
    assert!(matches!(result, Err(PluginError::Failed(_))));

    fs::write(dir.path().join("brctl-container-list.txt"), "").unwrap();
    let result = BrctlParser
        .parse(&[dir.path().to_path_buf()], None)
        .unwrap()
        .unwrap();
    assert_eq!(result["containers"], Value::Array(Vec::new()));
}

fn database(dir: &Path, name: &str, sql: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, sqlite_bytes(sql)).unwrap();
    path
}

#[test]
fn accessibility_tcc_dumps_every_table() {
    let dir = TempDir::new().unwrap();
    let path = database(dir.path(), "TCC.db", TCC_SQL);

    let result = AccessibilityTccParser.parse(&[path], None).unwrap().unwrap();
    let tables: Vec<&String> = result.keys().collect();
    assert_eq!(tables, vec!["access", "admin"]);
    assert_eq!(result["access"].as_array().unwrap().len(), 2);
    assert_eq!(result["access"][0]["client"], "com.example.helper");
    assert_eq!(result["access"][0]["auth_value"], 2);
    assert_eq!(result["admin"][0]["value"], 15);
}

#[test]
fn accessibility_tcc_rejects_non_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("TCC.db");
    fs::write(&path, "this is a text file that only pretends to be TCC.db").unwrap();
    assert!(matches!(
        AccessibilityTccParser.parse(&[path], None),
        Err(PluginError::Failed(_))
    ));
}

#[test]
fn appinstallation_dumps_tables_from_ios_13() {
    let dir = TempDir::new().unwrap();
    let path = database(dir.path(), "appstored.sqlitedb", APPSTORED_SQL);

    for version in [None, Some(IosVersion::new(13, 0, 0)), Some(IosVersion::new(17, 2, 1))] {
        let result = AppInstallationParser
            .parse(&[path.clone()], version.as_ref())
            .unwrap()
            .unwrap();
        let rows = &result["app_updates"];
        assert_eq!(rows[0]["install_date"], 726480000.0);
        assert_eq!(rows[0]["receipt"], "cafe");
        assert_eq!(rows[1]["install_date"], Value::Null);
    }
}

#[test]
fn appinstallation_reads_update_rows_before_ios_13() {
    let dir = TempDir::new().unwrap();
    let path = database(dir.path(), "appstored.sqlitedb", APPSTORED_SQL);

    let result = AppInstallationParser
        .parse(&[path], Some(&IosVersion::new(12, 4, 1)))
        .unwrap()
        .unwrap();
    assert_eq!(
        result["app_updates"],
        serde_json::json!([
            {"pid": 412, "bundle_id": "com.apple.Pages", "install_date": "2024-01-09T08:00:00+00:00"},
            {"pid": 413, "bundle_id": "com.apple.Numbers", "install_date": null}
        ])
    );
}
