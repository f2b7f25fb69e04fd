//! Built-in analyzers.

mod parsed_inventory;
mod process_census;

pub use parsed_inventory::ParsedInventoryAnalyzer;
pub use process_census::ProcessCensusAnalyzer;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use super::{Analyzer, PluginError, PluginResult};

/// Every built-in analyzer, in registration order.
pub fn builtin() -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(ProcessCensusAnalyzer),
        Arc::new(ParsedInventoryAnalyzer),
    ]
}

/// Load `<parsed_dir>/<file_name>`, reporting an absent file as missing input.
pub(crate) fn load_parsed(parsed_dir: &Path, file_name: &str) -> PluginResult<Value> {
    let path = parsed_dir.join(file_name);
    if !path.is_file() {
        return Err(PluginError::MissingInput(file_name.to_string()));
    }
    let contents = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&contents)?)
}
