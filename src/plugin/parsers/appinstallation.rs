//! App Store installation history (`logs/appinstallation/appstored.sqlitedb`).
//!
//! From iOS 13 on the whole database is dumped. Older releases only get the
//! `app_updates` rows, with `install_date` turned into a UTC timestamp.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde_json::{json, Map, Value};

use super::{single, sqlite};
use crate::manifest::IosVersion;
use crate::plugin::{Parser, PluginResult, StructuredResult};

/// Seconds between the Unix epoch and the Cocoa epoch (2001-01-01).
const COCOA_EPOCH_OFFSET: i64 = 978_307_200;

const FULL_DUMP_SINCE_MAJOR: u32 = 13;

pub struct AppInstallationParser;

impl Parser for AppInstallationParser {
    fn name(&self) -> &str {
        "appinstallation"
    }

    fn version(&self) -> &str {
        "2.0.0"
    }

    fn description(&self) -> &str {
        "Parsing app installation logs"
    }

    fn input_key(&self) -> &str {
        "appinstallation"
    }

    fn parse(
        &self,
        paths: &[PathBuf],
        ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>> {
        let path = single(paths)?;
        match ios_version {
            Some(version) if version.major < FULL_DUMP_SINCE_MAJOR => {
                tracing::warn!(ios_version = %version, "old appstored layout, reading app_updates only");
                legacy_updates(path).map(Some)
            }
            _ => sqlite::dump_tables(path).map(Some),
        }
    }
}

fn legacy_updates(path: &Path) -> PluginResult<StructuredResult> {
    let conn = sqlite::open_read_only(path)?;
    let rows = (|| -> rusqlite::Result<Vec<Value>> {
        let mut stmt = conn.prepare("SELECT pid, bundle_id, install_date FROM app_updates")?;
        let rows = stmt
            .query_map([], |row| {
                let install_date: Option<f64> = row.get(2)?;
                Ok(json!({
                    "pid": sqlite::to_json(row.get_ref(0)?),
                    "bundle_id": sqlite::to_json(row.get_ref(1)?),
                    "install_date": install_date.and_then(cocoa_to_utc),
                }))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })()
    .map_err(|e| sqlite::unreadable(path, e))?;

    let mut result = Map::new();
    result.insert("app_updates".to_string(), Value::Array(rows));
    Ok(result)
}

/// RFC 3339 UTC time for a Cocoa epoch timestamp.
fn cocoa_to_utc(seconds: f64) -> Option<String> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64 + COCOA_EPOCH_OFFSET, nanos).map(|t| t.to_rfc3339())
}
