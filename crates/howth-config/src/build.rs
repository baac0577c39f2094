//! `[build]` section: entry points and resolution behavior.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Extensions probed for extension-less specifiers, in default priority order.
pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "json"];

pub const DEFAULT_MAIN_FIELDS: &[&str] = &["module", "main"];

pub const DEFAULT_CONDITIONS: &[&str] = &["import", "module", "default"];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    strings(DEFAULT_EXTENSIONS)
}

fn default_main_fields() -> Vec<String> {
    strings(DEFAULT_MAIN_FIELDS)
}

fn default_conditions() -> Vec<String> {
    strings(DEFAULT_CONDITIONS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Entry points, relative to `root`.
    pub entries: Vec<PathBuf>,

    /// Project root. Relative roots are taken from the directory the config
    /// was discovered in.
    pub root: PathBuf,

    pub extensions: Vec<String>,

    /// Tie-break order when several extensions match. Empty means the order
    /// of `extensions`.
    pub extension_priority: Vec<String>,

    pub main_fields: Vec<String>,

    /// Conditions matched against package `exports`, in priority order.
    pub conditions: Vec<String>,

    /// Abort the build on the first module error.
    pub fail_fast: bool,

    /// Concurrent module workers. Defaults to available parallelism.
    pub parallelism: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            root: default_root(),
            extensions: default_extensions(),
            extension_priority: Vec::new(),
            main_fields: default_main_fields(),
            conditions: default_conditions(),
            fail_fast: false,
            parallelism: None,
        }
    }
}

impl BuildOptions {
    pub fn effective_priority(&self) -> &[String] {
        if self.extension_priority.is_empty() {
            &self.extensions
        } else {
            &self.extension_priority
        }
    }

    pub fn effective_parallelism(&self) -> usize {
        self.parallelism
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(4)
            })
    }
}
