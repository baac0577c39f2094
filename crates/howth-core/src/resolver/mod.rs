//! Specifier resolution.
//!
//! Turns the specifiers a module imports into concrete targets:
//!
//! 1. `./x`, `../x` and absolute paths probe the filesystem relative to the
//!    importer.
//! 2. Built-in names consult the [`CompatRegistry`]: a shim becomes an
//!    ordinary file target, a passthrough stays a built-in, a disallowed
//!    module is an error.
//! 3. Anything else is a package looked up through `node_modules`, memoized
//!    per build in a [`LookupCache`].
//!
//! Resolution is a pure function of the specifier, the importer, the
//! registry and the filesystem seen through the [`Runtime`].

mod error;
mod package;
mod probe;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use howth_config::BuildOptions;
use howth_graph::{Runtime, SourceType};
use path_clean::PathClean;

use crate::compat::{CompatEntry, CompatLookup, CompatRegistry, NODE_PREFIX};

pub use error::ResolveError;
pub use package::PackageSpecifier;
pub use probe::pick_candidate;

use probe::Prober;

/// Probing configuration, taken from `[build]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Probed in order, without a leading dot.
    pub extensions: Vec<String>,
    /// Tie-break ranking; empty means `extensions` order.
    pub extension_priority: Vec<String>,
    pub main_fields: Vec<String>,
    pub conditions: Vec<String>,
}

impl ResolveOptions {
    pub fn from_build(build: &BuildOptions) -> Self {
        Self {
            extensions: build.extensions.clone(),
            extension_priority: build.extension_priority.clone(),
            main_fields: build.main_fields.clone(),
            conditions: build.conditions.clone(),
        }
    }

    pub fn effective_priority(&self) -> &[String] {
        if self.extension_priority.is_empty() {
            &self.extensions
        } else {
            &self.extension_priority
        }
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from_build(&BuildOptions::default())
    }
}

/// Where a specifier points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// A canonical file path.
    File(PathBuf),
    /// A built-in replaced by a shim file, which joins the graph.
    Shim { builtin: String, path: PathBuf },
    /// A built-in left to the host runtime.
    Builtin(String),
}

/// Per-build memo of bare package lookups, keyed by specifier and the
/// directory the search starts from.
#[derive(Debug, Default)]
pub struct LookupCache {
    entries: DashMap<(String, PathBuf), Result<PathBuf, ResolveError>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, specifier: &str, dir: &Path) -> Option<Result<PathBuf, ResolveError>> {
        self.entries
            .get(&(specifier.to_string(), dir.to_path_buf()))
            .map(|entry| entry.value().clone())
    }

    fn insert(&self, specifier: &str, dir: &Path, result: Result<PathBuf, ResolveError>) {
        self.entries
            .insert((specifier.to_string(), dir.to_path_buf()), result);
    }
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// Resolves specifiers against one registry, runtime and option set.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<CompatRegistry>,
    runtime: Arc<dyn Runtime>,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(
        registry: Arc<CompatRegistry>,
        runtime: Arc<dyn Runtime>,
        options: ResolveOptions,
    ) -> Self {
        Self {
            registry,
            runtime,
            options,
        }
    }

    pub fn registry(&self) -> &Arc<CompatRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    fn prober(&self) -> Prober<'_> {
        Prober {
            runtime: self.runtime.as_ref(),
            options: &self.options,
        }
    }

    /// Resolve `specifier` as written in the module at `importer`.
    pub async fn resolve(
        &self,
        specifier: &str,
        importer: &Path,
        lookups: &LookupCache,
    ) -> Result<ResolvedTarget, ResolveError> {
        let importer_dir = importer.parent().unwrap_or(Path::new("/"));

        if is_path_specifier(specifier) {
            let base = importer_dir.join(specifier).clean();
            let found = self
                .prober()
                .resolve_path(specifier, &base, Some(SourceType::from_path(importer)))
                .await?
                .ok_or_else(|| ResolveError::not_found(specifier, importer))?;
            return self
                .canonicalize(specifier, importer, &found)
                .await
                .map(ResolvedTarget::File);
        }

        match self.registry.lookup(specifier) {
            CompatLookup::Builtin { name, entry } => {
                return match entry {
                    CompatEntry::Disallowed => Err(ResolveError::UnsupportedBuiltin {
                        name: name.to_string(),
                    }),
                    CompatEntry::Passthrough => Ok(ResolvedTarget::Builtin(name.to_string())),
                    CompatEntry::NativeShim { path } => {
                        if !self.runtime.is_file(path).await {
                            return Err(ResolveError::not_found(specifier, importer));
                        }
                        let path = self.canonicalize(specifier, importer, path).await?;
                        Ok(ResolvedTarget::Shim {
                            builtin: name.to_string(),
                            path,
                        })
                    }
                };
            }
            CompatLookup::NotBuiltin => {}
        }

        if let Some(name) = specifier.strip_prefix(NODE_PREFIX) {
            return Err(ResolveError::UnsupportedBuiltin {
                name: name.to_string(),
            });
        }

        if let Some(cached) = lookups.get(specifier, importer_dir) {
            return cached.map(ResolvedTarget::File);
        }

        let result = match self.prober().resolve_package(specifier, importer_dir).await {
            Ok(found) => self.canonicalize(specifier, importer, &found).await,
            Err(err) => Err(err),
        };
        lookups.insert(specifier, importer_dir, result.clone());
        result.map(ResolvedTarget::File)
    }

    /// Resolve an entry point relative to the project root, with the same
    /// file probing as a relative import.
    pub async fn resolve_entry(&self, entry: &Path, root: &Path) -> Result<PathBuf, ResolveError> {
        let specifier = entry.to_string_lossy();
        let base = root.join(entry).clean();
        let found = self
            .prober()
            .resolve_path(&specifier, &base, None)
            .await?
            .ok_or_else(|| ResolveError::not_found(&specifier, root))?;
        self.canonicalize(&specifier, root, &found).await
    }

    async fn canonicalize(
        &self,
        specifier: &str,
        importer: &Path,
        path: &Path,
    ) -> Result<PathBuf, ResolveError> {
        self.runtime
            .canonicalize(path)
            .await
            .map_err(|_| ResolveError::not_found(specifier, importer))
    }
}
