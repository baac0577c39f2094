//! Upward staleness propagation.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashSet as HashSet;

use super::super::{ModuleId, ModuleState};
use super::graph::ModuleGraph;
use crate::{GraphError, Result};

impl ModuleGraph {
    /// Mark the module at `path` `Stale` and propagate to every transitive
    /// importer. Returns the newly staled ids, sorted.
    ///
    /// Unknown paths are a no-op. Propagation stops at modules that are
    /// already `Stale`, so invalidating twice leaves the graph unchanged.
    pub fn invalidate_by_path(&self, path: &Path) -> Result<Vec<ModuleId>> {
        let id = ModuleId::new(path)?;
        self.invalidate(&id)
    }

    /// [`invalidate_by_path`](Self::invalidate_by_path) for an existing id.
    pub fn invalidate(&self, origin: &ModuleId) -> Result<Vec<ModuleId>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if !inner.modules.contains_key(origin) {
            return Ok(Vec::new());
        }

        let bound = inner.modules.len();
        let mut visited: HashSet<ModuleId> = HashSet::default();
        let mut stack = vec![origin.clone()];
        let mut staled = Vec::new();

        while let Some(current) = stack.pop() {
            let Some(module) = inner.modules.get_mut(&current) else {
                continue;
            };
            if !visited.insert(current.clone()) {
                continue;
            }
            if visited.len() > bound {
                return Err(GraphError::CyclicInvalidationOverflow {
                    origin: origin.clone(),
                    visited: visited.len(),
                });
            }
            if module.state == ModuleState::Stale {
                continue;
            }

            Arc::make_mut(module).state = ModuleState::Stale;
            if let Some(importers) = inner.dependents.get(&current) {
                stack.extend(importers.iter().cloned());
            }
            staled.push(current);
        }

        tracing::trace!(origin = %origin, staled = staled.len(), "invalidated module");
        staled.sort();
        Ok(staled)
    }

    /// Invalidate several paths in one call. The result is sorted and free of
    /// duplicates.
    pub fn invalidate_paths<'a, I>(&self, paths: I) -> Result<Vec<ModuleId>>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut staled = Vec::new();
        for path in paths {
            staled.extend(self.invalidate_by_path(path)?);
        }
        staled.sort();
        staled.dedup();
        Ok(staled)
    }
}
