//! Query methods for ModuleGraph.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::super::{BuiltinDependency, Edge, EdgeTarget, Module, ModuleId, ModuleState};
use super::graph::ModuleGraph;
use crate::GraphStatistics;

impl ModuleGraph {
    /// Retrieve a module by ID.
    pub fn module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        self.inner.read().modules.get(id).cloned()
    }

    /// Retrieve a module by path, using the same normalization as [`ModuleId`].
    pub fn module_by_path(&self, path: &Path) -> Option<Arc<Module>> {
        let id = ModuleId::new(path).ok()?;
        self.module(&id)
    }

    /// All modules, ordered by id.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        let inner = self.inner.read();
        let mut modules: Vec<_> = inner.modules.values().cloned().collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));
        modules
    }

    pub fn module_ids(&self) -> Vec<ModuleId> {
        let inner = self.inner.read();
        let mut ids: Vec<_> = inner.modules.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.inner.read().modules.contains_key(id)
    }

    pub fn state(&self, id: &ModuleId) -> Option<ModuleState> {
        self.inner.read().modules.get(id).map(|module| module.state)
    }

    pub fn len(&self) -> usize {
        self.inner.read().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().modules.is_empty()
    }

    /// Outgoing edges of a module in specifier order.
    pub fn edges(&self, id: &ModuleId) -> Vec<Edge> {
        self.inner
            .read()
            .modules
            .get(id)
            .map(|module| module.edges.clone())
            .unwrap_or_default()
    }

    /// Modules whose edges point at `id`, ordered by id.
    pub fn importers(&self, id: &ModuleId) -> Vec<ModuleId> {
        let inner = self.inner.read();
        let mut importers: Vec<_> = inner
            .dependents
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        importers.sort();
        importers
    }

    pub fn entry_points(&self) -> Vec<ModuleId> {
        let inner = self.inner.read();
        let mut entries: Vec<_> = inner.entry_points.iter().cloned().collect();
        entries.sort();
        entries
    }

    /// Ids of modules currently in `state`, ordered.
    pub fn modules_in_state(&self, state: ModuleState) -> Vec<ModuleId> {
        let inner = self.inner.read();
        let mut ids: Vec<_> = inner
            .modules
            .values()
            .filter(|module| module.state == state)
            .map(|module| module.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn stale_modules(&self) -> Vec<ModuleId> {
        self.modules_in_state(ModuleState::Stale)
    }

    /// Module edges whose target is not present in the graph.
    pub fn dangling_edges(&self) -> Vec<(ModuleId, Edge)> {
        let inner = self.inner.read();
        let mut dangling = Vec::new();
        for module in inner.modules.values() {
            for edge in &module.edges {
                if let EdgeTarget::Module(target) = &edge.target {
                    if !inner.modules.contains_key(target) {
                        dangling.push((module.id.clone(), edge.clone()));
                    }
                }
            }
        }
        dangling.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.specifier.cmp(&b.1.specifier)));
        dangling
    }

    /// Built-ins left to the host runtime, with their importers.
    pub fn builtin_dependencies(&self) -> Vec<BuiltinDependency> {
        let inner = self.inner.read();
        let mut builtins: BTreeMap<String, BuiltinDependency> = BTreeMap::new();
        for module in inner.modules.values() {
            for edge in &module.edges {
                if let EdgeTarget::Builtin(name) = &edge.target {
                    builtins
                        .entry(name.clone())
                        .or_insert_with(|| BuiltinDependency::new(name.clone()))
                        .push_importer(module.id.clone());
                }
            }
        }
        builtins
            .into_values()
            .map(|mut dep| {
                dep.importers.sort();
                dep
            })
            .collect()
    }

    /// Counts by state and edge kind.
    pub fn statistics(&self) -> GraphStatistics {
        let inner = self.inner.read();
        let mut stats = GraphStatistics {
            module_count: inner.modules.len(),
            entry_count: inner.entry_points.len(),
            ..GraphStatistics::default()
        };
        for module in inner.modules.values() {
            stats.record_state(module.state);
            for edge in &module.edges {
                stats.record_edge(&edge.target);
            }
        }
        stats
    }
}
