//! Serialization and comparable views of a ModuleGraph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::{ConfigHash, ContentHash, Edge, EdgeTarget, Module, ModuleId, ModuleState};
use super::graph::ModuleGraph;
use crate::{GraphError, Result};

/// Helper to escape labels for DOT format.
fn escape_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

/// Order-independent view of a graph, suitable for equality checks across
/// builds with different scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub modules: BTreeMap<ModuleId, ModuleSnapshot>,
    pub entry_points: Vec<ModuleId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    pub state: ModuleState,
    pub content_hash: Option<ContentHash>,
    pub config_hash: Option<ConfigHash>,
    pub edges: Vec<Edge>,
    pub code: Option<String>,
}

impl From<&Module> for ModuleSnapshot {
    fn from(module: &Module) -> Self {
        Self {
            state: module.state,
            content_hash: module.content_hash,
            config_hash: module.config_hash,
            edges: module.edges.clone(),
            code: module.artifact.as_ref().map(|artifact| artifact.code.clone()),
        }
    }
}

impl ModuleGraph {
    pub fn snapshot(&self) -> GraphSnapshot {
        let inner = self.inner.read();
        let modules = inner
            .modules
            .iter()
            .map(|(id, module)| (id.clone(), ModuleSnapshot::from(module.as_ref())))
            .collect();
        let mut entry_points: Vec<_> = inner.entry_points.iter().cloned().collect();
        entry_points.sort();
        GraphSnapshot {
            modules,
            entry_points,
        }
    }

    /// Export the graph as DOT format for visualization. Built-in edges are
    /// drawn to box-shaped `builtin:<name>` nodes.
    pub fn to_dot_format(&self) -> String {
        let mut output = String::from("digraph ModuleGraph {\n");
        let all_modules = self.modules();

        for module in &all_modules {
            output.push_str("    \"");
            output.push_str(&escape_label(&module.id.path_string()));
            output.push_str("\";\n");
        }

        for builtin in self.builtin_dependencies() {
            output.push_str(&format!(
                "    \"builtin:{}\" [shape=box];\n",
                escape_label(&builtin.name)
            ));
        }

        for module in &all_modules {
            for edge in &module.edges {
                let target = match &edge.target {
                    EdgeTarget::Module(id) => id.path_string().into_owned(),
                    EdgeTarget::Builtin(name) => format!("builtin:{name}"),
                    EdgeTarget::Unresolved => continue,
                };
                output.push_str("    \"");
                output.push_str(&escape_label(&module.id.path_string()));
                output.push_str("\" -> \"");
                output.push_str(&escape_label(&target));
                output.push_str("\";\n");
            }
        }

        output.push_str("}\n");
        output
    }

    /// Export the graph and modules to JSON.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct GraphJson<'a> {
            modules: Vec<&'a Module>,
            entry_points: Vec<ModuleId>,
        }

        let all_modules = self.modules();
        let graph_json = GraphJson {
            modules: all_modules.iter().map(|module| module.as_ref()).collect(),
            entry_points: self.entry_points(),
        };

        serde_json::to_string_pretty(&graph_json)
            .map_err(|e| GraphError::Serialization(format!("failed to serialize graph: {e}")))
    }
}
