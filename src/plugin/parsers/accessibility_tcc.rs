//! Accessibility privacy grants (`logs/Accessibility/TCC.db`).

use std::path::PathBuf;

use super::{single, sqlite};
use crate::manifest::IosVersion;
use crate::plugin::{Parser, PluginResult, StructuredResult};

pub struct AccessibilityTccParser;

impl Parser for AccessibilityTccParser {
    fn name(&self) -> &str {
        "accessibility_tcc"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Parsing Accessibility TCC logs"
    }

    fn input_key(&self) -> &str {
        "Accessibility-TCC"
    }

    fn parse(
        &self,
        paths: &[PathBuf],
        _ios_version: Option<&IosVersion>,
    ) -> PluginResult<Option<StructuredResult>> {
        sqlite::dump_tables(single(paths)?).map(Some)
    }
}
