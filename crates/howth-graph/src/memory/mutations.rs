//! Mutation methods for ModuleGraph.

use std::sync::Arc;

use super::super::{Edge, Module, ModuleId, ModuleState};
use super::graph::ModuleGraph;
use crate::{GraphError, Result};

fn targets_of(module: &Module) -> Vec<ModuleId> {
    module.module_targets().cloned().collect()
}

impl ModuleGraph {
    /// Insert or replace a module, keeping the reverse index in step with its
    /// edges. Returns the previous record, if any.
    ///
    /// Entry membership is sticky: a module registered through
    /// [`set_entry_points`](Self::set_entry_points) stays an entry.
    pub fn upsert_module(&self, mut module: Module) -> Option<Arc<Module>> {
        let mut inner = self.inner.write();
        let id = module.id.clone();
        module.is_entry |= inner.entry_points.contains(&id);

        let previous = inner.modules.remove(&id);
        if let Some(previous) = &previous {
            let old_targets = targets_of(previous);
            inner.unlink(&id, &old_targets);
        }

        let new_targets = targets_of(&module);
        inner.link(&id, &new_targets);

        if module.is_entry {
            inner.entry_points.insert(id.clone());
        }

        inner.modules.insert(id, Arc::new(module));
        previous
    }

    /// Append one edge to an existing importer.
    pub fn add_edge(&self, importer: &ModuleId, edge: Edge) -> Result<()> {
        let mut inner = self.inner.write();
        let module = inner
            .modules
            .get_mut(importer)
            .ok_or_else(|| GraphError::ModuleNotFound(importer.clone()))?;

        let target = edge.target.as_module().cloned();
        Arc::make_mut(module).edges.push(edge);

        if let Some(target) = target {
            inner.link(importer, [&target]);
        }
        Ok(())
    }

    /// Replace all outgoing edges of an importer.
    pub fn set_edges(&self, importer: &ModuleId, edges: Vec<Edge>) -> Result<()> {
        self.update_module(importer, |module| module.edges = edges)
    }

    /// Apply an in-place edit to a module record. Edge changes made by `edit`
    /// are reflected in the reverse index.
    pub fn update_module<F>(&self, id: &ModuleId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Module),
    {
        let mut inner = self.inner.write();
        let module = inner
            .modules
            .get_mut(id)
            .ok_or_else(|| GraphError::ModuleNotFound(id.clone()))?;

        let module = Arc::make_mut(module);
        let old_targets = targets_of(module);
        let was_entry = module.is_entry;
        edit(module);
        let new_targets = targets_of(module);
        let is_entry = module.is_entry;

        if old_targets != new_targets {
            inner.unlink(id, &old_targets);
            inner.link(id, &new_targets);
        }
        if was_entry != is_entry {
            if is_entry {
                inner.entry_points.insert(id.clone());
            } else {
                inner.entry_points.remove(id);
            }
        }
        Ok(())
    }

    /// Remove a module and its outgoing edges. Every module importing it
    /// becomes `Stale` so the next traversal re-resolves the import.
    pub fn remove_module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        let mut inner = self.inner.write();
        let removed = inner.modules.remove(id)?;

        let targets = targets_of(&removed);
        inner.unlink(id, &targets);
        inner.entry_points.remove(id);

        if let Some(importers) = inner.dependents.remove(id) {
            for importer in importers {
                if let Some(module) = inner.modules.get_mut(&importer) {
                    Arc::make_mut(module).state = ModuleState::Stale;
                }
            }
        }

        Some(removed)
    }

    /// Set a module's state unconditionally, returning the previous one.
    pub fn set_state(&self, id: &ModuleId, state: ModuleState) -> Result<ModuleState> {
        let mut inner = self.inner.write();
        let module = inner
            .modules
            .get_mut(id)
            .ok_or_else(|| GraphError::ModuleNotFound(id.clone()))?;

        let previous = module.state;
        if previous != state {
            Arc::make_mut(module).state = state;
        }
        Ok(previous)
    }

    /// Atomically move a module to `to` if its current state is one of `from`.
    ///
    /// Returns whether the transition happened.
    pub fn transition(&self, id: &ModuleId, from: &[ModuleState], to: ModuleState) -> Result<bool> {
        let mut inner = self.inner.write();
        let module = inner
            .modules
            .get_mut(id)
            .ok_or_else(|| GraphError::ModuleNotFound(id.clone()))?;

        if !from.contains(&module.state) {
            return Ok(false);
        }
        Arc::make_mut(module).state = to;
        Ok(true)
    }

    /// Mark one module `Stale` without propagating to its importers.
    pub fn mark_stale(&self, id: &ModuleId) -> Result<()> {
        self.set_state(id, ModuleState::Stale).map(|_| ())
    }

    /// Mark every module `Stale` without propagation.
    pub fn mark_all_stale(&self) {
        let mut inner = self.inner.write();
        for module in inner.modules.values_mut() {
            if module.state != ModuleState::Stale {
                Arc::make_mut(module).state = ModuleState::Stale;
            }
        }
    }

    /// Replace the entry point set, updating each module's entry flag.
    pub fn set_entry_points(&self, entries: &[ModuleId]) {
        let mut inner = self.inner.write();
        let previous: Vec<ModuleId> = inner.entry_points.drain().collect();
        for id in previous {
            if let Some(module) = inner.modules.get_mut(&id) {
                Arc::make_mut(module).is_entry = false;
            }
        }
        for id in entries {
            if let Some(module) = inner.modules.get_mut(id) {
                Arc::make_mut(module).is_entry = true;
            }
            inner.entry_points.insert(id.clone());
        }
    }

    /// Remove every module.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.modules.clear();
        inner.dependents.clear();
        inner.entry_points.clear();
    }
}
