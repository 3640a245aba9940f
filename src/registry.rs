//! Name → tool descriptor table.

use crate::error::{KdevError, Result};
use crate::tool::ToolDescriptor;
use crate::tools::{Cilium, Kind, Kubectl};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct Registry {
    tools: BTreeMap<String, Arc<dyn ToolDescriptor>>,
}

impl Registry {
    /// The tools kdev ships with.
    pub fn builtin() -> Self {
        Self::from_descriptors(vec![
            Arc::new(Cilium::new()) as Arc<dyn ToolDescriptor>,
            Arc::new(Kind::new()),
            Arc::new(Kubectl::new()),
        ])
    }

    /// Build a registry from explicit descriptors. A later descriptor with a
    /// duplicate name replaces the earlier one.
    pub fn from_descriptors(descriptors: Vec<Arc<dyn ToolDescriptor>>) -> Self {
        let tools = descriptors
            .into_iter()
            .map(|d| (d.name().to_string(), d))
            .collect();
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDescriptor>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Descriptors sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<dyn ToolDescriptor>> {
        self.tools.values().cloned().collect()
    }

    /// Closest registered name to `name`, if any is reasonably close.
    pub fn suggest(&self, name: &str) -> Option<String> {
        self.tools
            .keys()
            .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate.clone())
    }

    /// Look up `names`, or every tool when `names` is empty.
    pub fn resolve_names(&self, names: &[String]) -> Result<Vec<Arc<dyn ToolDescriptor>>> {
        if names.is_empty() {
            return Ok(self.descriptors());
        }
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| KdevError::UnknownTool {
                    name: name.clone(),
                    suggestion: self.suggest(name),
                })
            })
            .collect()
    }
}
