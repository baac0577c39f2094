use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use howth_graph::{
    BuiltinDependency, Edge, GraphSnapshot, GraphStatistics, Module, ModuleGraph, ModuleId,
    ModuleState,
};

/// Read-only window onto the engine's graph, for packagers and dev servers.
///
/// The view shares storage with the engine: it always reflects the latest
/// applied state, and cloning it is cheap.
#[derive(Debug, Clone)]
pub struct GraphView {
    graph: ModuleGraph,
}

impl GraphView {
    pub(crate) fn new(graph: ModuleGraph) -> Self {
        Self { graph }
    }

    pub fn module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        self.graph.module(id)
    }

    pub fn module_by_path(&self, path: &Path) -> Option<Arc<Module>> {
        self.graph.module_by_path(path)
    }

    /// Every module, sorted by id.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        self.graph.modules()
    }

    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.graph.module_ids()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.graph.contains(id)
    }

    pub fn state(&self, id: &ModuleId) -> Option<ModuleState> {
        self.graph.state(id)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn edges(&self, id: &ModuleId) -> Vec<Edge> {
        self.graph.edges(id)
    }

    pub fn importers(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.graph.importers(id)
    }

    pub fn transitive_importers(&self, id: &ModuleId) -> BTreeSet<ModuleId> {
        self.graph.transitive_importers([id])
    }

    pub fn entry_points(&self) -> Vec<ModuleId> {
        self.graph.entry_points()
    }

    pub fn stale_modules(&self) -> Vec<ModuleId> {
        self.graph.stale_modules()
    }

    pub fn dangling_edges(&self) -> Vec<(ModuleId, Edge)> {
        self.graph.dangling_edges()
    }

    /// Passthrough built-ins and the modules importing them.
    pub fn builtin_dependencies(&self) -> Vec<BuiltinDependency> {
        self.graph.builtin_dependencies()
    }

    pub fn statistics(&self) -> GraphStatistics {
        self.graph.statistics()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    pub fn to_dot_format(&self) -> String {
        self.graph.to_dot_format()
    }

    pub fn to_json(&self) -> howth_graph::Result<String> {
        self.graph.to_json()
    }
}
