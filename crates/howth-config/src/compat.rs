//! `[compat]` section: how Node.js built-in imports are satisfied.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Baseline outcome for every built-in before per-module overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatPreset {
    /// Built-ins are left to the host runtime.
    #[default]
    Node,
    /// Built-ins are rejected unless shimmed.
    Browser,
}

impl fmt::Display for CompatPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("node"),
            Self::Browser => f.write_str("browser"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatMode {
    Disallowed,
    Passthrough,
}

/// Override for one built-in.
///
/// ```toml
/// [compat.modules]
/// fs = { shim = "shim/fs.ts" }
/// child_process = "disallowed"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompatRule {
    Shim { shim: PathBuf },
    Mode(CompatMode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatOptions {
    pub preset: CompatPreset,
    /// Base directory for shim paths. Defaults to the project root.
    pub shim_root: Option<PathBuf>,
    /// Per-module overrides keyed by built-in name (with or without `node:`).
    pub modules: IndexMap<String, CompatRule>,
}
