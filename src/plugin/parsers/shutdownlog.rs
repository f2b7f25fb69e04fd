//! Processes still running at shutdown (`shutdown.log`).
//!
//! The log lists `remaining client pid: N (path)` lines followed by a
//! `SIGTERM: [epoch]` line that closes the group for one shutdown.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use super::{read_text, single};
use crate::manifest::IosVersion;
use crate::plugin::{Parser, PluginResult, StructuredResult};

pub struct ShutdownLogParser;

impl Parser for ShutdownLogParser {
    fn name(&self) -> &str {
        "shutdownlog"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Parsing shutdown.log file"
    }

    fn input_key(&self) -> &str {
        "shutdownlog"
    }

    fn parse(
        &self,
        paths: &[PathBuf],
        _ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>> {
        let text = read_text(single(paths)?)?;
        let mut result = Map::new();
        result.insert("shutdowns".to_string(), parse_shutdowns(&text));
        Ok(Some(result))
    }
}

fn parse_shutdowns(text: &str) -> Value {
    static CLIENT: OnceLock<Regex> = OnceLock::new();
    static SIGTERM: OnceLock<Regex> = OnceLock::new();
    let client = CLIENT.get_or_init(|| {
        Regex::new(r"remaining client pid: (\d+) \((.*)\)").expect("client pattern should be valid")
    });
    let sigterm = SIGTERM
        .get_or_init(|| Regex::new(r"SIGTERM: \[(\d+)\]").expect("sigterm pattern should be valid"));

    let mut shutdowns = Vec::new();
    let mut pending: Vec<Value> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = client.captures(line) {
            let pid: u64 = caps[1].parse().unwrap_or_default();
            pending.push(json!({ "pid": pid, "path": &caps[2] }));
        } else if let Some(caps) = sigterm.captures(line) {
            let timestamp: Option<u64> = caps[1].parse().ok();
            shutdowns.push(json!({
                "timestamp": timestamp,
                "clients": std::mem::take(&mut pending),
            }));
        }
    }
    // A log cut short before its SIGTERM line still has useful clients
    if !pending.is_empty() {
        shutdowns.push(json!({ "timestamp": null, "clients": pending }));
    }
    Value::Array(shutdowns)
}
