//! Traversal methods for ModuleGraph.

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashSet as HashSet;

use super::super::ModuleId;
use super::graph::ModuleGraph;

impl ModuleGraph {
    /// Returns true if `from` imports `to` directly or transitively.
    pub fn depends_on(&self, from: &ModuleId, to: &ModuleId) -> bool {
        if from == to {
            return true;
        }

        let inner = self.inner.read();
        let mut visited = HashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back(from.clone());

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            if let Some(module) = inner.modules.get(&current) {
                for dep in module.module_targets() {
                    if dep == to {
                        return true;
                    }
                    queue.push_back(dep.clone());
                }
            }
        }

        false
    }

    /// Every module that imports one of `seeds`, directly or transitively.
    /// Seeds themselves are included only when reached through a cycle.
    pub fn transitive_importers<'a, I>(&self, seeds: I) -> BTreeSet<ModuleId>
    where
        I: IntoIterator<Item = &'a ModuleId>,
    {
        let inner = self.inner.read();
        let mut found = BTreeSet::new();
        let mut queue: VecDeque<ModuleId> = seeds.into_iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            if let Some(importers) = inner.dependents.get(&current) {
                for importer in importers {
                    if found.insert(importer.clone()) {
                        queue.push_back(importer.clone());
                    }
                }
            }
        }

        found
    }

    /// Modules reachable from the entry points over module edges.
    pub fn reachable_from_entries(&self) -> HashSet<ModuleId> {
        let inner = self.inner.read();
        let mut visited = HashSet::default();
        let mut queue: VecDeque<ModuleId> = inner.entry_points.iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(module) = inner.modules.get(&current) {
                queue.extend(module.module_targets().cloned());
            }
        }

        visited
    }

    /// Remove every module no entry point reaches. Returns the removed ids,
    /// sorted.
    pub fn prune_unreachable(&self) -> Vec<ModuleId> {
        let reachable = self.reachable_from_entries();
        let unreachable: Vec<ModuleId> = self
            .module_ids()
            .into_iter()
            .filter(|id| !reachable.contains(id))
            .collect();

        // Importers of an unreachable module are unreachable too, so the
        // staleness `remove_module` applies only lands on modules removed here.
        for id in &unreachable {
            self.remove_module(id);
        }
        unreachable
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::super::super::{Edge, EdgeTarget, Module, ModuleState, SourceType};
    use super::*;

    fn id(name: &str) -> ModuleId {
        ModuleId::new(format!("/proj/{name}")).unwrap()
    }

    fn module(name: &str, deps: &[&str]) -> Module {
        let edges = deps
            .iter()
            .map(|dep| Edge::new(format!("./{dep}"), EdgeTarget::Module(id(dep))))
            .collect();
        Module::builder(id(name), PathBuf::from(format!("/proj/{name}")), SourceType::TypeScript)
            .state(ModuleState::Resolved)
            .edges(edges)
            .build()
    }

    #[test]
    fn transitive_importers_walk_upward() {
        let graph = ModuleGraph::new();
        graph.upsert_module(module("a.ts", &["b.ts"]));
        graph.upsert_module(module("b.ts", &["c.ts"]));
        graph.upsert_module(module("c.ts", &[]));
        graph.upsert_module(module("x.ts", &[]));

        let importers = graph.transitive_importers([&id("c.ts")]);
        assert_eq!(importers.into_iter().collect::<Vec<_>>(), vec![id("a.ts"), id("b.ts")]);
    }

    #[test]
    fn prune_removes_only_unreachable() {
        let graph = ModuleGraph::new();
        graph.upsert_module(module("a.ts", &["b.ts"]));
        graph.upsert_module(module("b.ts", &[]));
        graph.upsert_module(module("orphan.ts", &["lonely.ts"]));
        graph.upsert_module(module("lonely.ts", &[]));
        graph.set_entry_points(&[id("a.ts")]);

        let removed = graph.prune_unreachable();
        assert_eq!(removed, vec![id("lonely.ts"), id("orphan.ts")]);
        assert_eq!(graph.module_ids(), vec![id("a.ts"), id("b.ts")]);
        assert_eq!(graph.state(&id("a.ts")), Some(ModuleState::Resolved));
        assert!(graph.importers(&id("lonely.ts")).is_empty());
    }

    #[test]
    fn depends_on_follows_cycles() {
        let graph = ModuleGraph::new();
        graph.upsert_module(module("a.ts", &["b.ts"]));
        graph.upsert_module(module("b.ts", &["a.ts"]));
        assert!(graph.depends_on(&id("a.ts"), &id("b.ts")));
        assert!(graph.depends_on(&id("b.ts"), &id("a.ts")));
        assert!(!graph.depends_on(&id("a.ts"), &id("z.ts")));
    }
}
