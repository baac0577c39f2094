//! What a build reports back.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use howth_graph::{ModuleErrorKind, ModuleId};
use miette::Diagnostic;
use serde::Serialize;

use crate::cache::CacheStats;

/// How a module differs from the graph before the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Every reachable module was visited.
    Complete,
    /// Stopped through a [`CancelToken`](super::CancelToken).
    Cancelled,
    /// Stopped at the first module error because `fail_fast` is set.
    Aborted,
}

/// A per-module resolution or transform error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{module}: {message}")]
pub struct BuildError {
    pub module: ModuleId,
    pub kind: ModuleErrorKind,
    pub specifier: Option<String>,
    pub message: String,
}

impl Diagnostic for BuildError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("howth::build::{}", self.kind.as_str())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self.kind {
            ModuleErrorKind::NotFound => "Check the import path and that the file exists",
            ModuleErrorKind::AmbiguousExtension => {
                "Add the extension to the import or set build.extension_priority"
            }
            ModuleErrorKind::UnsupportedBuiltin => {
                "Shim the built-in under [compat.modules] or set it to passthrough"
            }
            ModuleErrorKind::TransformFailure => "Fix the syntax error reported above",
        };
        Some(Box::new(help))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BuildStats {
    /// Modules in the graph after the build.
    pub modules: usize,
    /// Modules visited by this build.
    pub visited: usize,
    pub duration: Duration,
    /// Cache counters accumulated during this build.
    pub cache: CacheStats,
}

/// Outcome of `build` or `rebuild`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub changes: BTreeMap<ModuleId, ChangeKind>,
    /// Sorted by module, then in the module's own order.
    pub errors: Vec<BuildError>,
    pub status: BuildStatus,
    pub stats: BuildStats,
}

impl BuildResult {
    pub fn is_complete(&self) -> bool {
        self.status == BuildStatus::Complete
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn change(&self, id: &ModuleId) -> Option<ChangeKind> {
        self.changes.get(id).copied()
    }

    /// Ids with the given change kind, sorted.
    pub fn changed_with(&self, kind: ChangeKind) -> Vec<&ModuleId> {
        self.changes
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn errors_for<'a>(
        &'a self,
        id: &ModuleId,
    ) -> impl Iterator<Item = &'a BuildError> + use<'a> {
        let id = id.clone();
        self.errors.iter().filter(move |error| error.module == id)
    }
}
