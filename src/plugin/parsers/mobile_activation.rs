//! Mobile activation daemon logs (`mobileactivationd.log*`).

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map};

use super::read_text;
use crate::manifest::IosVersion;
use crate::plugin::{Parser, PluginError, PluginResult, StructuredResult};

pub struct MobileActivationParser;

/// One log event; continuation lines are folded into `message`.
#[derive(Debug, Serialize)]
struct Event {
    timestamp: String,
    pid: u32,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread: Option<String>,
    message: String,
    source: String,
}

impl Parser for MobileActivationParser {
    fn name(&self) -> &str {
        "mobile_activation"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Parsing mobileactivationd logs"
    }

    fn input_key(&self) -> &str {
        "mobile_activation"
    }

    fn parse(
        &self,
        paths: &[PathBuf],
        _ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>> {
        let mut events = Vec::new();
        for path in paths {
            let source = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            events.extend(parse_log(&read_text(path)?, &source));
        }

        let mut result = Map::new();
        result.insert("files".to_string(), json!(paths.len()));
        result.insert(
            "events".to_string(),
            serde_json::to_value(&events).map_err(PluginError::Json)?,
        );
        Ok(Some(result))
    }
}

fn parse_log(text: &str, source: &str) -> Vec<Event> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let line_pattern = LINE.get_or_init(|| {
        Regex::new(
            r"^(?P<ts>\w{3} \w{3}\s+\d+ \d{2}:\d{2}:\d{2} \d{4}) \[(?P<pid>\d+)\] <(?P<level>[^>]+)>: (?:\((?P<thread>0x[0-9a-fA-F]+)\) )?(?P<msg>.*)$",
        )
        .expect("activation log pattern should be valid")
    });

    let mut events: Vec<Event> = Vec::new();
    for line in text.lines() {
        match line_pattern.captures(line) {
            Some(caps) => events.push(Event {
                timestamp: caps["ts"].to_string(),
                pid: caps["pid"].parse().unwrap_or_default(),
                level: caps["level"].to_string(),
                thread: caps.name("thread").map(|m| m.as_str().to_string()),
                message: caps["msg"].to_string(),
                source: source.to_string(),
            }),
            None => {
                if let Some(last) = events.last_mut() {
                    if !line.trim().is_empty() {
                        last.message.push('\n');
                        last.message.push_str(line);
                    }
                }
            }
        }
    }
    events
}
