use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EdgeTarget, ModuleState};

/// Basic statistics about a `ModuleGraph` useful for dashboards or logging.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphStatistics {
    pub module_count: usize,
    pub entry_count: usize,
    pub module_edges: usize,
    pub builtin_edges: usize,
    pub unresolved_edges: usize,
    pub unvisited: usize,
    pub resolving: usize,
    pub resolved: usize,
    pub stale: usize,
    pub errored: usize,
}

impl GraphStatistics {
    pub(crate) fn record_state(&mut self, state: ModuleState) {
        match state {
            ModuleState::Unvisited => self.unvisited += 1,
            ModuleState::Resolving => self.resolving += 1,
            ModuleState::Resolved => self.resolved += 1,
            ModuleState::Stale => self.stale += 1,
            ModuleState::Error => self.errored += 1,
        }
    }

    pub(crate) fn record_edge(&mut self, target: &EdgeTarget) {
        match target {
            EdgeTarget::Module(_) => self.module_edges += 1,
            EdgeTarget::Builtin(_) => self.builtin_edges += 1,
            EdgeTarget::Unresolved => self.unresolved_edges += 1,
        }
    }
}

impl fmt::Display for GraphStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} modules ({} resolved, {} stale, {} errored), {} edges",
            self.module_count,
            self.resolved,
            self.stale,
            self.errored,
            self.module_edges + self.builtin_edges + self.unresolved_edges
        )
    }
}
