//! Registered plugins, in registration order.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{analyzers, parsers, Analyzer, Parser, PluginDescriptor, PluginKind};
use crate::manifest::table;

/// Validated parsers and analyzers available to the orchestrators.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    parsers: Vec<Arc<dyn Parser>>,
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for parser in parsers::builtin() {
            registry.register_parser(parser);
        }
        for analyzer in analyzers::builtin() {
            registry.register_analyzer(analyzer);
        }
        registry
    }

    /// Add a parser if its attribute set is complete.
    ///
    /// Returns `false` and logs a warning when the candidate is rejected.
    pub fn register_parser(&mut self, parser: Arc<dyn Parser>) -> bool {
        let reason = self
            .common_problem(
                PluginKind::Parser,
                parser.name(),
                parser.description(),
                parser.version(),
            )
            .or_else(|| {
                (!table::is_known_key(parser.input_key()))
                    .then(|| format!("unknown input key '{}'", parser.input_key()))
            });

        if let Some(reason) = reason {
            reject(PluginKind::Parser, parser.name(), &reason);
            return false;
        }
        tracing::debug!(parser = parser.name(), input = parser.input_key(), "registered parser");
        self.parsers.push(parser);
        true
    }

    /// Add an analyzer if its attribute set is complete.
    pub fn register_analyzer(&mut self, analyzer: Arc<dyn Analyzer>) -> bool {
        let extension = analyzer.output_extension();
        let reason = self
            .common_problem(
                PluginKind::Analyzer,
                analyzer.name(),
                analyzer.description(),
                analyzer.version(),
            )
            .or_else(|| {
                let valid = !extension.is_empty()
                    && extension.chars().all(|c| c.is_ascii_alphanumeric());
                (!valid).then(|| format!("invalid output extension '{}'", extension))
            });

        if let Some(reason) = reason {
            reject(PluginKind::Analyzer, analyzer.name(), &reason);
            return false;
        }
        tracing::debug!(analyzer = analyzer.name(), "registered analyzer");
        self.analyzers.push(analyzer);
        true
    }

    /// Descriptors of one kind, in registration order.
    pub fn discover(&self, kind: PluginKind) -> Vec<PluginDescriptor> {
        match kind {
            PluginKind::Parser => self
                .parsers
                .iter()
                .map(|p| PluginDescriptor::of_parser(p.as_ref()))
                .collect(),
            PluginKind::Analyzer => self
                .analyzers
                .iter()
                .map(|a| PluginDescriptor::of_analyzer(a.as_ref()))
                .collect(),
        }
    }

    /// Names of one kind, in registration order.
    pub fn names(&self, kind: PluginKind) -> Vec<String> {
        match kind {
            PluginKind::Parser => self.parsers.iter().map(|p| p.name().to_string()).collect(),
            PluginKind::Analyzer => self
                .analyzers
                .iter()
                .map(|a| a.name().to_string())
                .collect(),
        }
    }

    pub fn contains(&self, kind: PluginKind, name: &str) -> bool {
        match kind {
            PluginKind::Parser => self.parser(name).is_some(),
            PluginKind::Analyzer => self.analyzer(name).is_some(),
        }
    }

    pub fn parser(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.parsers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn analyzer(&self, name: &str) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.iter().find(|a| a.name() == name).cloned()
    }

    fn common_problem(
        &self,
        kind: PluginKind,
        name: &str,
        description: &str,
        version: &str,
    ) -> Option<String> {
        if !is_safe_name(name) {
            return Some(format!("name '{}' is not a valid file name stem", name));
        }
        let taken: BTreeSet<String> = self.names(kind).into_iter().collect();
        if taken.contains(name) {
            return Some("name is already registered".to_string());
        }
        if description.trim().is_empty() {
            return Some("missing description".to_string());
        }
        if version.trim().is_empty() {
            return Some("missing version".to_string());
        }
        None
    }
}

fn reject(kind: PluginKind, name: &str, reason: &str) {
    tracing::warn!(kind = %kind, plugin = name, reason, "plugin rejected");
}

/// Non-empty, ASCII alphanumerics plus `_` and `-`, not starting with `-`.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
