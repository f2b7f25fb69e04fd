//! Per-user process counts from the parsed process table.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::json;

use super::load_parsed;
use crate::plugin::{Analyzer, PluginError, PluginResult};

pub struct ProcessCensusAnalyzer;

impl Analyzer for ProcessCensusAnalyzer {
    fn name(&self) -> &str {
        "process_census"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Count running processes per user"
    }

    fn output_extension(&self) -> &str {
        "json"
    }

    fn analyze(&self, parsed_dir: &Path, output: &Path) -> PluginResult<i32> {
        let ps = load_parsed(parsed_dir, "ps.json")?;
        let processes = ps["processes"]
            .as_array()
            .ok_or_else(|| PluginError::failed("ps.json has no process list"))?;

        let mut by_user: BTreeMap<String, usize> = BTreeMap::new();
        for process in processes {
            let user = process["USER"].as_str().unwrap_or("unknown");
            *by_user.entry(user.to_string()).or_default() += 1;
        }

        let report = json!({
            "total": processes.len(),
            "by_user": by_user,
        });
        let mut bytes = serde_json::to_vec_pretty(&report)?;
        bytes.push(b'\n');
        fs::write(output, bytes)?;
        Ok(0)
    }
}
