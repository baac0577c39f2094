//! Node.js built-in compatibility registry.
//!
//! Maps every built-in module name to how an import of it is satisfied:
//! a native shim file that joins the graph like any other module, a hard
//! error, or a passthrough left to the host runtime.
//!
//! A registry is an immutable value. Changing compat configuration means
//! building a new registry, whose [`fingerprint`](CompatRegistry::fingerprint)
//! differs and therefore invalidates every cached transform.

mod builtins;

use std::fmt;
use std::path::{Path, PathBuf};

use howth_config::{CompatMode, CompatOptions, CompatPreset, CompatRule};
use howth_graph::ConfigHash;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builtins::{
    NODE_BUILTINS, NODE_PREFIX, PREFIX_ONLY_BUILTINS, all_builtins, canonical_builtin,
    is_prefix_only,
};

const REGISTRY_FORMAT: &str = "howth-compat/v1";

/// How a built-in import is satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompatEntry {
    /// Replace the built-in with the module at `path`.
    NativeShim { path: PathBuf },
    /// Importing the built-in is an error.
    Disallowed,
    /// Leave the import to the host runtime.
    Passthrough,
}

impl CompatEntry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeShim { .. } => "native_shim",
            Self::Disallowed => "disallowed",
            Self::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for CompatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeShim { path } => write!(f, "native_shim({})", path.display()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Result of [`CompatRegistry::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatLookup<'a> {
    Builtin {
        /// Canonical name, without the `node:` prefix.
        name: &'a str,
        entry: &'a CompatEntry,
    },
    NotBuiltin,
}

impl CompatLookup<'_> {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompatError {
    #[error("'{0}' is not a Node.js built-in module")]
    UnknownBuiltin(String),

    #[error("invalid shim for '{name}': {reason}")]
    InvalidShim { name: String, reason: String },
}

/// Immutable built-in name → [`CompatEntry`] table.
#[derive(Debug, Clone)]
pub struct CompatRegistry {
    entries: FxHashMap<&'static str, CompatEntry>,
    preset: CompatPreset,
    fingerprint: ConfigHash,
}

impl CompatRegistry {
    pub fn builder(preset: CompatPreset) -> CompatRegistryBuilder {
        CompatRegistryBuilder::new(preset)
    }

    /// Every built-in passes through to the host.
    pub fn node() -> Self {
        Self::from_table(CompatPreset::Node, FxHashMap::default())
    }

    /// Every built-in is disallowed.
    pub fn browser() -> Self {
        Self::from_table(CompatPreset::Browser, FxHashMap::default())
    }

    /// Build a registry from `[compat]` configuration. Relative shim paths
    /// are resolved against `shim_root`.
    pub fn from_options(options: &CompatOptions, shim_root: &Path) -> Result<Self, CompatError> {
        let mut builder = Self::builder(options.preset).shim_root(shim_root);
        for (name, rule) in &options.modules {
            builder = match rule {
                CompatRule::Shim { shim } => builder.shim(name.clone(), shim.clone()),
                CompatRule::Mode(CompatMode::Disallowed) => builder.disallow(name.clone()),
                CompatRule::Mode(CompatMode::Passthrough) => builder.passthrough(name.clone()),
            };
        }
        builder.build()
    }

    fn from_table(preset: CompatPreset, overrides: FxHashMap<&'static str, CompatEntry>) -> Self {
        let default_entry = match preset {
            CompatPreset::Node => CompatEntry::Passthrough,
            CompatPreset::Browser => CompatEntry::Disallowed,
        };

        let mut entries = FxHashMap::default();
        for name in all_builtins() {
            entries.insert(name, default_entry.clone());
        }
        entries.extend(overrides);

        let fingerprint = Self::compute_fingerprint(preset, &entries);
        Self {
            entries,
            preset,
            fingerprint,
        }
    }

    fn compute_fingerprint(
        preset: CompatPreset,
        entries: &FxHashMap<&'static str, CompatEntry>,
    ) -> ConfigHash {
        let mut names: Vec<&&'static str> = entries.keys().collect();
        names.sort();

        let mut hasher = ConfigHash::builder()
            .field(REGISTRY_FORMAT)
            .field(preset.to_string());
        for name in names {
            let entry = &entries[*name];
            hasher = hasher.field(name).field(entry.as_str());
            if let CompatEntry::NativeShim { path } = entry {
                hasher = hasher.field(path.to_string_lossy().as_bytes());
            }
        }
        hasher.finish()
    }

    /// Look up how `specifier` (e.g. `fs`, `node:fs`, `node:test`) is
    /// satisfied. Anything outside the built-in table is `NotBuiltin`.
    pub fn lookup(&self, specifier: &str) -> CompatLookup<'_> {
        let Some((name, _prefixed)) = canonical_builtin(specifier) else {
            return CompatLookup::NotBuiltin;
        };
        match self.entries.get_key_value(name) {
            Some((name, entry)) => CompatLookup::Builtin { name: *name, entry },
            None => CompatLookup::NotBuiltin,
        }
    }

    pub fn preset(&self) -> CompatPreset {
        self.preset
    }

    /// Digest over the whole table; part of every transform config hash.
    pub fn fingerprint(&self) -> ConfigHash {
        self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by name.
    pub fn entries(&self) -> Vec<(&'static str, &CompatEntry)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(name, entry)| (*name, entry)).collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Shims declared in the table, sorted by built-in name.
    pub fn shims(&self) -> Vec<(&'static str, &Path)> {
        self.entries()
            .into_iter()
            .filter_map(|(name, entry)| match entry {
                CompatEntry::NativeShim { path } => Some((name, path.as_path())),
                _ => None,
            })
            .collect()
    }
}

impl Default for CompatRegistry {
    fn default() -> Self {
        Self::node()
    }
}

enum PendingRule {
    Shim(PathBuf),
    Disallow,
    Passthrough,
}

/// Collects overrides; validation happens once in [`build`](Self::build).
pub struct CompatRegistryBuilder {
    preset: CompatPreset,
    shim_root: Option<PathBuf>,
    rules: Vec<(String, PendingRule)>,
}

impl CompatRegistryBuilder {
    pub fn new(preset: CompatPreset) -> Self {
        Self {
            preset,
            shim_root: None,
            rules: Vec::new(),
        }
    }

    /// Directory relative shim paths are joined onto.
    pub fn shim_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shim_root = Some(dir.into());
        self
    }

    pub fn shim(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.rules.push((name.into(), PendingRule::Shim(path.into())));
        self
    }

    pub fn disallow(mut self, name: impl Into<String>) -> Self {
        self.rules.push((name.into(), PendingRule::Disallow));
        self
    }

    pub fn passthrough(mut self, name: impl Into<String>) -> Self {
        self.rules.push((name.into(), PendingRule::Passthrough));
        self
    }

    /// Later rules for the same built-in win.
    pub fn build(self) -> Result<CompatRegistry, CompatError> {
        let mut overrides = FxHashMap::default();

        for (raw_name, rule) in self.rules {
            let name = builtins::canonical_override_name(&raw_name)
                .ok_or_else(|| CompatError::UnknownBuiltin(raw_name.clone()))?;

            let entry = match rule {
                PendingRule::Shim(path) => {
                    if path.as_os_str().is_empty() {
                        return Err(CompatError::InvalidShim {
                            name: raw_name,
                            reason: "shim path is empty".to_string(),
                        });
                    }
                    let path = match (&self.shim_root, path.is_absolute()) {
                        (Some(root), false) => root.join(path),
                        _ => path,
                    };
                    CompatEntry::NativeShim { path: path.clean() }
                }
                PendingRule::Disallow => CompatEntry::Disallowed,
                PendingRule::Passthrough => CompatEntry::Passthrough,
            };
            overrides.insert(name, entry);
        }

        Ok(CompatRegistry::from_table(self.preset, overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_preset_passes_everything_through() {
        let registry = CompatRegistry::node();
        assert_eq!(
            registry.lookup("node:fs"),
            CompatLookup::Builtin {
                name: "fs",
                entry: &CompatEntry::Passthrough
            }
        );
        assert!(registry.lookup("fs/promises").is_builtin());
        assert_eq!(registry.lookup("lodash"), CompatLookup::NotBuiltin);
        assert_eq!(registry.lookup("./fs"), CompatLookup::NotBuiltin);
    }

    #[test]
    fn prefix_only_builtins_need_the_prefix() {
        let registry = CompatRegistry::node();
        assert!(registry.lookup("node:test").is_builtin());
        assert_eq!(registry.lookup("test"), CompatLookup::NotBuiltin);
        assert_eq!(registry.lookup("node:not-a-module"), CompatLookup::NotBuiltin);
    }

    #[test]
    fn overrides_replace_preset_entries() {
        let registry = CompatRegistry::builder(CompatPreset::Browser)
            .shim_root("/proj")
            .shim("node:fs", "shim/fs.ts")
            .passthrough("path")
            .build()
            .unwrap();

        assert_eq!(
            registry.lookup("fs"),
            CompatLookup::Builtin {
                name: "fs",
                entry: &CompatEntry::NativeShim {
                    path: PathBuf::from("/proj/shim/fs.ts")
                }
            }
        );
        assert!(matches!(
            registry.lookup("path"),
            CompatLookup::Builtin {
                entry: CompatEntry::Passthrough,
                ..
            }
        ));
        assert!(matches!(
            registry.lookup("child_process"),
            CompatLookup::Builtin {
                entry: CompatEntry::Disallowed,
                ..
            }
        ));
        assert_eq!(registry.shims(), vec![("fs", Path::new("/proj/shim/fs.ts"))]);
    }

    #[test]
    fn unknown_override_fails_to_load() {
        let err = CompatRegistry::builder(CompatPreset::Node)
            .disallow("left-pad")
            .build()
            .unwrap_err();
        assert_eq!(err, CompatError::UnknownBuiltin("left-pad".into()));

        let err = CompatRegistry::builder(CompatPreset::Node)
            .shim("fs", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, CompatError::InvalidShim { .. }));
    }

    #[test]
    fn fingerprint_tracks_table_contents() {
        let a = CompatRegistry::node();
        let b = CompatRegistry::node();
        let c = CompatRegistry::builder(CompatPreset::Node)
            .disallow("child_process")
            .build()
            .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), CompatRegistry::browser().fingerprint());
    }

    #[test]
    fn from_options_reads_config_rules() {
        let mut options = CompatOptions::default();
        options.modules.insert(
            "fs".into(),
            CompatRule::Shim {
                shim: PathBuf::from("shim/fs.ts"),
            },
        );
        options
            .modules
            .insert("child_process".into(), CompatRule::Mode(CompatMode::Disallowed));

        let registry = CompatRegistry::from_options(&options, Path::new("/proj")).unwrap();
        assert_eq!(registry.shims().len(), 1);
        assert!(matches!(
            registry.lookup("node:child_process"),
            CompatLookup::Builtin {
                entry: CompatEntry::Disallowed,
                ..
            }
        ));
        assert_eq!(registry.len(), all_builtins().len());
    }
}
