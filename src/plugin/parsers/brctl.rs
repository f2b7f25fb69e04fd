//! iCloud Drive daemon state (`brctl/` directory).
//!
//! Two files are read from the directory: `brctl-container-list.txt`, one
//! line per container, and `brctl-dump.txt`, a sectioned dump where each
//! section title sits on the line above a row of dashes.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use super::{read_text, single};
use crate::manifest::IosVersion;
use crate::plugin::{Parser, PluginError, PluginResult, StructuredResult};

const CONTAINER_LIST: &str = "brctl-container-list.txt";
const DUMP: &str = "brctl-dump.txt";
const SECTION_RULE: &str = "-----------------------------------------------------";

pub struct BrctlParser;

impl Parser for BrctlParser {
    fn name(&self) -> &str {
        "brctl"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Parsing brctl files"
    }

    fn input_key(&self) -> &str {
        "brctl"
    }

    fn parse(
        &self,
        paths: &[PathBuf],
        _ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>> {
        let dir = single(paths)?;
        let list = dir.join(CONTAINER_LIST);
        let dump = dir.join(DUMP);
        if !list.is_file() && !dump.is_file() {
            return Err(PluginError::failed(format!(
                "neither {} nor {} found in {}",
                CONTAINER_LIST,
                DUMP,
                dir.display()
            )));
        }

        let mut result = Map::new();
        if list.is_file() {
            result.insert(
                "containers".to_string(),
                Value::Array(parse_container_list(&read_text(&list)?)),
            );
        }
        if dump.is_file() {
            result.extend(parse_dump(&read_text(&dump)?));
        }
        Ok(Some(result))
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("brctl pattern should be valid"))
}

fn parse_container_list(text: &str) -> Vec<Value> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = regex(
        &PATTERN,
        r"id:(?P<id>[^ ]*) localizedName:'(?P<name>[^']*)' documents:'(?P<documents>[^']*)' \[(?P<privacy>[^:]*):(?P<status>[^\]]*)\] clients: (?P<clients>.*)",
    );

    pattern
        .captures_iter(text)
        .map(|caps| {
            let mut container = Map::new();
            container.insert("id".to_string(), json!(&caps["id"]));
            container.insert("localizedName".to_string(), json!(&caps["name"]));
            container.insert("documents".to_string(), json!(&caps["documents"]));
            container.insert(caps["privacy"].to_string(), json!(&caps["status"]));
            container.insert("clients".to_string(), json!(&caps["clients"]));
            Value::Object(container)
        })
        .collect()
}

/// Split the dump into titled sections, in file order.
fn split_sections(text: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut sections = vec![("header".to_string(), String::new())];

    for (i, line) in lines.iter().enumerate() {
        if line.trim() == SECTION_RULE {
            // The title line was already appended to the previous section
            let title = i
                .checked_sub(1)
                .map(|prev| lines[prev].trim().to_string())
                .unwrap_or_default();
            if let Some((_, body)) = sections.last_mut() {
                if let Some(prev) = i.checked_sub(1) {
                    if body.ends_with(lines[prev]) {
                        body.truncate(body.len() - lines[prev].len());
                    }
                }
            }
            sections.push((title, String::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push_str(line);
        }
    }
    sections
}

fn parse_dump(text: &str) -> Map<String, Value> {
    let sections = split_sections(text);
    let section = |name: &str| {
        sections
            .iter()
            .find(|(title, _)| title == name)
            .map(|(_, body)| body.as_str())
    };

    let mut result = Map::new();
    if let Some(header) = section("header") {
        result.insert("header".to_string(), parse_header(header));
    }
    if let Some((_, body)) = sections.iter().find(|(t, _)| t.starts_with("boot_history")) {
        result.insert("boot_history".to_string(), parse_boot_history(body));
    }
    if let Some(body) = section("server_state") {
        result.insert("server_state".to_string(), parse_server_state(body));
    }
    if let Some(body) = section("client_state") {
        result.insert("client_state".to_string(), parse_client_state(body));
    }
    for name in ["system", "scheduler"] {
        if let Some(body) = section(name) {
            result.insert(name.to_string(), parse_plus_items(body));
        }
    }
    result.insert(
        "sections".to_string(),
        sections.iter().map(|(title, _)| json!(title)).collect(),
    );
    result
}

fn parse_header(header: &str) -> Value {
    static PAIR: OnceLock<Regex> = OnceLock::new();
    static TAKEN: OnceLock<Regex> = OnceLock::new();
    let pair = regex(&PAIR, r"(?m)^([\w ]+):\s+(.+)$");
    let taken = regex(
        &TAKEN,
        r"dump taken at (.*?) \[account=(\d+)\] \[inCarry=(\w+)\] \[home=(.+)\]",
    );

    let mut output = Map::new();
    for caps in pair.captures_iter(header) {
        let mut value = caps[2].trim();
        if value.starts_with('<') && value.ends_with('>') && value.len() >= 2 {
            value = &value[1..value.len() - 1];
        }
        let value = if value.contains(", ") {
            Value::Array(value.split(", ").map(Value::from).collect())
        } else {
            Value::from(value)
        };
        output.insert(caps[1].trim().to_string(), value);
    }

    if let Some(caps) = taken.captures(header) {
        output.insert("timestamp".to_string(), json!(&caps[1]));
        output.insert("account".to_string(), json!(&caps[2]));
        output.insert("inCarry".to_string(), json!(&caps[3]));
        output.insert("home".to_string(), json!(&caps[4]));
    }
    Value::Object(output)
}

fn parse_boot_history(body: &str) -> Value {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = regex(
        &PATTERN,
        r"\[(.+?)\] OS:(.+?) CloudDocs:(.+?) BirdSchema:(.+?) DBSchema:(.+) DeviceID:(.+)",
    );

    body.lines()
        .filter_map(|line| pattern.captures(line))
        .map(|caps| {
            json!({
                "date": &caps[1],
                "OS": &caps[2],
                "CloudDocs": &caps[3],
                "BirdSchema": &caps[4],
                "DBSchema": &caps[5],
                "DeviceID": caps[6].trim(),
            })
        })
        .collect()
}

fn parse_server_state(body: &str) -> Value {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = regex(&PATTERN, r"(last-sync|nextRank|minUsedTime):(\S+)");

    let output: Map<String, Value> = pattern
        .captures_iter(body)
        .map(|caps| (caps[1].replace('-', "_"), json!(&caps[2])))
        .collect();
    Value::Object(output)
}

/// `key = value;` assignments; numbers are typed when they parse.
fn parse_client_state(body: &str) -> Value {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = regex(&PATTERN, r"^\s*(\w+)\s*=\s*(.*);");

    let mut output = Map::new();
    for line in body.lines() {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let raw = caps[2].trim_matches('"');
        let value = if let Ok(int) = raw.parse::<i64>() {
            Value::from(int)
        } else if let Some(float) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
            Value::from(float)
        } else {
            Value::from(raw)
        };
        output.insert(caps[1].to_string(), value);
    }
    Value::Object(output)
}

/// `+ key: value` lines, with ANSI colour codes removed.
fn parse_plus_items(body: &str) -> Value {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let ansi = regex(&ANSI, r"\x1b\[[0-9;]*m");

    let mut output = Map::new();
    for line in body.lines() {
        let line = ansi.replace_all(line, "");
        let line = line.trim();
        let Some(item) = line.strip_prefix('+') else {
            continue;
        };
        if let Some((key, value)) = item.split_once(':') {
            output.insert(key.trim().to_string(), json!(value.trim()));
        }
    }
    Value::Object(output)
}
