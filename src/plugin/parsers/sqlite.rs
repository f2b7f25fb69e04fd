//! Read-only access to the SQLite databases collected by sysdiagnose.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Value};

use crate::plugin::{PluginError, PluginResult, StructuredResult};

/// Open `path` without ever writing to it (no journal, no WAL checkpoint).
pub(crate) fn open_read_only(path: &Path) -> PluginResult<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| unreadable(path, e))
}

/// Every table of the database, keyed by table name, each a list of rows
/// keyed by column name.
pub(crate) fn dump_tables(path: &Path) -> PluginResult<StructuredResult> {
    let conn = open_read_only(path)?;
    let tables = table_names(&conn).map_err(|e| unreadable(path, e))?;

    let mut result = Map::new();
    for table in tables {
        let rows = dump_table(&conn, &table).map_err(|e| unreadable(path, e))?;
        tracing::trace!(table = %table, rows = rows.len(), "dumped table");
        result.insert(table, Value::Array(rows));
    }
    Ok(result)
}

fn table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn dump_table(conn: &Connection, table: &str) -> rusqlite::Result<Vec<Value>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_identifier(table)))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([])?;
    let mut dumped = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Map::new();
        for (index, column) in columns.iter().enumerate() {
            record.insert(column.clone(), to_json(row.get_ref(index)?));
        }
        dumped.push(Value::Object(record));
    }
    Ok(dumped)
}

/// Convert one SQLite cell. Blobs are hex encoded; non-finite reals become strings.
pub(crate) fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or_else(|| Value::String(f.to_string()), Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn unreadable(path: &Path, error: rusqlite::Error) -> PluginError {
    PluginError::failed(format!("could not parse {}: {}", path.display(), error))
}
