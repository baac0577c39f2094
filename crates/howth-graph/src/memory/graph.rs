//! Core ModuleGraph structure and inner state.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use super::super::{Module, ModuleId};

/// In-memory module dependency graph.
///
/// Cloning is cheap and yields another handle onto the same graph. Every
/// operation takes the lock for its whole duration, so each call observes and
/// leaves a consistent graph.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub(super) inner: Arc<RwLock<GraphInner>>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct GraphInner {
    /// All modules indexed by ID (wrapped in Arc for cheap cloning)
    pub modules: HashMap<ModuleId, Arc<Module>>,
    /// Reverse edges: module -> modules that import it. Non-owning; the
    /// importer's `edges` are the source of truth.
    pub dependents: HashMap<ModuleId, HashSet<ModuleId>>,
    /// Entry point modules
    pub entry_points: HashSet<ModuleId>,
}

impl GraphInner {
    pub(super) fn link<'a>(
        &mut self,
        importer: &ModuleId,
        targets: impl IntoIterator<Item = &'a ModuleId>,
    ) {
        for target in targets {
            self.dependents
                .entry(target.clone())
                .or_default()
                .insert(importer.clone());
        }
    }

    pub(super) fn unlink<'a>(
        &mut self,
        importer: &ModuleId,
        targets: impl IntoIterator<Item = &'a ModuleId>,
    ) {
        for target in targets {
            if let Some(importers) = self.dependents.get_mut(target) {
                importers.remove(importer);
                if importers.is_empty() {
                    self.dependents.remove(target);
                }
            }
        }
    }
}

impl ModuleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph sized for `capacity` modules.
    pub fn with_capacity(capacity: usize) -> Self {
        let inner = GraphInner {
            modules: HashMap::with_capacity_and_hasher(capacity, Default::default()),
            dependents: HashMap::with_capacity_and_hasher(capacity, Default::default()),
            entry_points: HashSet::default(),
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }
}
