//! Process table (`ps.txt`).

use std::path::PathBuf;

use serde_json::{json, Map, Value};

use super::{read_text, single};
use crate::manifest::IosVersion;
use crate::plugin::{Parser, PluginError, PluginResult, StructuredResult};

/// Parses the `ps` snapshot into one object per process, keyed by column.
pub struct PsParser;

impl Parser for PsParser {
    fn name(&self) -> &str {
        "ps"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Parsing ps.txt process table"
    }

    fn input_key(&self) -> &str {
        "ps"
    }

    fn parse(
        &self,
        paths: &[PathBuf],
        _ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>> {
        let text = read_text(single(paths)?)?;
        let processes = parse_table(&text)?;

        let mut result = Map::new();
        result.insert("count".to_string(), json!(processes.len()));
        result.insert("processes".to_string(), Value::Array(processes));
        Ok(Some(result))
    }
}

/// Parse a whitespace-aligned table whose last column may contain spaces.
fn parse_table(text: &str) -> PluginResult<Vec<Value>> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| PluginError::failed("empty process table"))?
        .split_whitespace()
        .collect();
    if header.len() < 2 {
        return Err(PluginError::failed("process table has no header"));
    }

    let mut rows = Vec::new();
    for line in lines {
        let fields = split_columns(line, header.len());
        if fields.len() != header.len() {
            tracing::debug!(line, "skipping short ps row");
            continue;
        }
        let row: Map<String, Value> = header
            .iter()
            .zip(fields)
            .map(|(column, field)| (column.to_string(), typed(field)))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

/// Split into at most `count` fields; the last one keeps inner spaces.
fn split_columns(line: &str, count: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(count);
    let mut rest = line.trim_start();
    while fields.len() + 1 < count {
        let Some(end) = rest.find(char::is_whitespace) else {
            break;
        };
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    let rest = rest.trim_end();
    if !rest.is_empty() {
        fields.push(rest);
    }
    fields
}

fn typed(field: &str) -> Value {
    field
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(field))
}
