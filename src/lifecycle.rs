//! Derived case lifecycle state.
//!
//! The state is never stored. It is recomputed from the registry and from
//! which per-plugin output files exist, so a failed run cannot regress it.

use std::fmt;

use crate::config::AppPaths;
use crate::error::CaseResult;
use crate::plugin::{PluginDescriptor, PluginKind, PluginRegistry};
use crate::registry::CaseRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Uninitialized,
    Ingested,
    Parsed { complete: bool },
    Analyzed { complete: bool },
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let completeness = |complete: bool| if complete { "complete" } else { "partial" };
        match self {
            CaseState::Uninitialized => f.write_str("uninitialized"),
            CaseState::Ingested => f.write_str("ingested"),
            CaseState::Parsed { complete } => write!(f, "parsed ({})", completeness(*complete)),
            CaseState::Analyzed { complete } => {
                write!(f, "analyzed ({})", completeness(*complete))
            }
        }
    }
}

/// State of one case plus which plugin outputs are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseStatus {
    pub case_id: String,
    pub state: CaseState,
    pub parsed: Vec<String>,
    pub unparsed: Vec<String>,
    pub analyzed: Vec<String>,
    pub unanalyzed: Vec<String>,
}

impl CaseStatus {
    /// Derive the status of `case_id` against the registered plugins.
    pub fn derive(
        paths: &AppPaths,
        registry: &CaseRegistry,
        plugins: &PluginRegistry,
        case_id: &str,
    ) -> CaseResult<Self> {
        if !registry.contains(case_id)? {
            return Ok(Self {
                case_id: case_id.to_string(),
                state: CaseState::Uninitialized,
                parsed: Vec::new(),
                unparsed: plugins.names(PluginKind::Parser),
                analyzed: Vec::new(),
                unanalyzed: plugins.names(PluginKind::Analyzer),
            });
        }

        let parsed_dir = paths.case_parsed_dir(case_id);
        let (parsed, unparsed): (Vec<String>, Vec<String>) = plugins
            .names(PluginKind::Parser)
            .into_iter()
            .partition(|name| parsed_dir.join(format!("{}.json", name)).is_file());

        let analyzed_dir = paths.case_analyzed_dir(case_id);
        let (analyzed, unanalyzed): (Vec<PluginDescriptor>, Vec<PluginDescriptor>) = plugins
            .discover(PluginKind::Analyzer)
            .into_iter()
            .partition(|d| analyzed_dir.join(format!("{}.{}", d.name, d.io_hint())).is_file());
        let analyzed = names_of(analyzed);
        let unanalyzed = names_of(unanalyzed);

        let state = if !analyzed.is_empty() {
            CaseState::Analyzed {
                complete: unanalyzed.is_empty(),
            }
        } else if !parsed.is_empty() {
            CaseState::Parsed {
                complete: unparsed.is_empty(),
            }
        } else {
            CaseState::Ingested
        };

        Ok(Self {
            case_id: case_id.to_string(),
            state,
            parsed,
            unparsed,
            analyzed,
            unanalyzed,
        })
    }
}

fn names_of(descriptors: Vec<PluginDescriptor>) -> Vec<String> {
    descriptors.into_iter().map(|d| d.name).collect()
}
