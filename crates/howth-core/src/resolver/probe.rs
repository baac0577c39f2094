//! File probing for relative, absolute and package-internal paths.
//!
//! Probing runs in stages. Every existing hit within one stage is a
//! candidate; the first stage with any hit decides the result, through
//! [`pick_candidate`] when it produced more than one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use howth_graph::{Dialect, Runtime, SourceType};
use serde::Deserialize;

use super::ResolveOptions;
use super::error::ResolveError;

/// Largest `package.json` the resolver will parse.
pub(crate) const MAX_MANIFEST_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions a TypeScript importer may write as their compiled `.js` form.
fn typescript_siblings(ext: &str) -> &'static [&'static str] {
    match ext {
        "js" => &["ts", "tsx"],
        "jsx" => &["tsx"],
        "mjs" => &["mts"],
        "cjs" => &["cts"],
        _ => &[],
    }
}

/// `base` with `.ext` appended, keeping any existing dots (`foo.config` →
/// `foo.config.ts`).
fn append_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Choose among same-stage candidates.
///
/// A single candidate wins outright. Otherwise candidates in the importer's
/// dialect are preferred, and the rest is decided by the first extension in
/// `priority`. No ranked candidate means the choice is ambiguous.
pub fn pick_candidate(
    specifier: &str,
    candidates: Vec<PathBuf>,
    importer: Option<Dialect>,
    priority: &[String],
) -> Result<PathBuf, ResolveError> {
    if candidates.len() <= 1 {
        return candidates
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::not_found(specifier, Path::new("")));
    }

    let chosen = {
        let in_dialect: Vec<&PathBuf> = match importer {
            Some(dialect) => candidates
                .iter()
                .filter(|path| {
                    extension_of(path).is_some_and(|ext| Dialect::from_extension(&ext) == dialect)
                })
                .collect(),
            None => Vec::new(),
        };

        if in_dialect.len() == 1 {
            Some(in_dialect[0].clone())
        } else {
            let pool: Vec<&PathBuf> = if in_dialect.is_empty() {
                candidates.iter().collect()
            } else {
                in_dialect
            };

            let mut best: Option<(usize, &PathBuf)> = None;
            let mut shared = false;
            for path in pool {
                let Some(rank) = extension_of(path)
                    .and_then(|ext| priority.iter().position(|p| *p == ext))
                else {
                    continue;
                };
                match best {
                    Some((best_rank, _)) if rank > best_rank => {}
                    Some((best_rank, _)) if rank == best_rank => shared = true,
                    _ => {
                        best = Some((rank, path));
                        shared = false;
                    }
                }
            }
            best.filter(|_| !shared).map(|(_, path)| path.clone())
        }
    };

    chosen.ok_or_else(|| ResolveError::AmbiguousExtension {
        specifier: specifier.to_string(),
        candidates,
    })
}

/// Probes the filesystem through the build [`Runtime`].
pub(crate) struct Prober<'a> {
    pub(crate) runtime: &'a dyn Runtime,
    pub(crate) options: &'a ResolveOptions,
}

impl Prober<'_> {
    /// Resolve `base` to a file: exact match, appended extensions, the
    /// TypeScript sibling of a `.js` specifier, then directory resolution.
    pub(crate) async fn resolve_path(
        &self,
        specifier: &str,
        base: &Path,
        importer: Option<SourceType>,
    ) -> Result<Option<PathBuf>, ResolveError> {
        if let Some(found) = self.resolve_file(specifier, base, importer).await? {
            return Ok(Some(found));
        }
        self.resolve_directory(specifier, base, importer).await
    }

    /// The file stages of [`resolve_path`](Self::resolve_path).
    pub(crate) async fn resolve_file(
        &self,
        specifier: &str,
        base: &Path,
        importer: Option<SourceType>,
    ) -> Result<Option<PathBuf>, ResolveError> {
        if self.runtime.is_file(base).await {
            return Ok(Some(base.to_path_buf()));
        }

        let dialect = importer.map(|source_type| source_type.dialect());

        let mut candidates = Vec::new();
        for ext in &self.options.extensions {
            let candidate = append_extension(base, ext);
            if self.runtime.is_file(&candidate).await {
                candidates.push(candidate);
            }
        }
        if !candidates.is_empty() {
            return self.pick(specifier, candidates, dialect).map(Some);
        }

        let typescript_importer =
            matches!(importer, Some(SourceType::TypeScript | SourceType::Tsx));
        if typescript_importer {
            if let Some(ext) = extension_of(base) {
                let mut siblings = Vec::new();
                for sibling in typescript_siblings(&ext) {
                    let candidate = base.with_extension(sibling);
                    if self.runtime.is_file(&candidate).await {
                        siblings.push(candidate);
                    }
                }
                if !siblings.is_empty() {
                    return self.pick(specifier, siblings, dialect).map(Some);
                }
            }
        }

        Ok(None)
    }

    /// `package.json` entry fields inside `dir`, then `index.<ext>`.
    pub(crate) async fn resolve_directory(
        &self,
        specifier: &str,
        dir: &Path,
        importer: Option<SourceType>,
    ) -> Result<Option<PathBuf>, ResolveError> {
        if !self.runtime.is_dir(dir).await {
            return Ok(None);
        }

        let manifest_path = dir.join("package.json");
        if self.runtime.is_file(&manifest_path).await {
            let manifest: serde_json::Map<String, serde_json::Value> =
                self.read_manifest(&manifest_path).await?;
            for field in &self.options.main_fields {
                let Some(entry) = manifest.get(field).and_then(|v| v.as_str()) else {
                    continue;
                };
                let target = path_clean::clean(dir.join(entry));
                if let Some(found) = self.resolve_file(specifier, &target, importer).await? {
                    return Ok(Some(found));
                }
            }
        }

        self.resolve_index(specifier, dir, importer).await
    }

    pub(crate) async fn resolve_index(
        &self,
        specifier: &str,
        dir: &Path,
        importer: Option<SourceType>,
    ) -> Result<Option<PathBuf>, ResolveError> {
        let mut candidates = Vec::new();
        for ext in &self.options.extensions {
            let candidate = dir.join(format!("index.{ext}"));
            if self.runtime.is_file(&candidate).await {
                candidates.push(candidate);
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }
        let dialect = importer.map(|source_type| source_type.dialect());
        self.pick(specifier, candidates, dialect).map(Some)
    }

    /// Read and parse a manifest, refusing anything over the size cap.
    pub(crate) async fn read_manifest<T>(&self, path: &Path) -> Result<T, ResolveError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let invalid = |message: String| ResolveError::InvalidManifest {
            path: path.to_path_buf(),
            message,
        };

        let metadata = self
            .runtime
            .metadata(path)
            .await
            .map_err(|e| invalid(e.to_string()))?;
        if metadata.size > MAX_MANIFEST_BYTES {
            return Err(invalid(format!(
                "{} bytes exceeds the {MAX_MANIFEST_BYTES} byte limit",
                metadata.size
            )));
        }

        let bytes = self
            .runtime
            .read_file(path)
            .await
            .map_err(|e| invalid(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))
    }

    fn pick(
        &self,
        specifier: &str,
        candidates: Vec<PathBuf>,
        dialect: Option<Dialect>,
    ) -> Result<PathBuf, ResolveError> {
        pick_candidate(
            specifier,
            candidates,
            dialect,
            self.options.effective_priority(),
        )
    }
}
