//! Plain-text summary of every parser output of a case.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use humansize::{format_size, BINARY};
use serde_json::Value;

use crate::plugin::{Analyzer, PluginError, PluginResult};

pub struct ParsedInventoryAnalyzer;

impl Analyzer for ParsedInventoryAnalyzer {
    fn name(&self) -> &str {
        "parsed_inventory"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Summarize parsed outputs"
    }

    fn output_extension(&self) -> &str {
        "txt"
    }

    fn analyze(&self, parsed_dir: &Path, output: &Path) -> PluginResult<i32> {
        if !parsed_dir.is_dir() {
            return Err(PluginError::MissingInput(parsed_dir.display().to_string()));
        }

        let mut files: Vec<_> = fs::read_dir(parsed_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut report = String::new();
        for path in &files {
            let size = fs::metadata(path)?.len();
            let value: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = writeln!(
                report,
                "{:<32} {:>10}  {}",
                name,
                format_size(size, BINARY),
                describe(&value)
            );
        }
        let _ = writeln!(report, "{} parsed output(s)", files.len());

        fs::write(output, report)?;
        Ok(0)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("keys: {}", keys.join(", "))
        }
        Value::Array(items) => format!("{} item(s)", items.len()),
        other => format!("scalar {}", other),
    }
}
