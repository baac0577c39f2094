//! Bare specifier resolution through `node_modules`.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde_json::{Map, Value};

use super::error::ResolveError;
use super::probe::Prober;

/// A bare specifier split into package name and optional subpath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSpecifier<'a> {
    pub name: &'a str,
    pub subpath: Option<&'a str>,
}

impl<'a> PackageSpecifier<'a> {
    /// Split `lodash/fp` or `@scope/pkg/sub/path`. Returns `None` for an
    /// incomplete scoped name such as `@scope`.
    pub fn parse(specifier: &'a str) -> Option<Self> {
        if specifier.is_empty() {
            return None;
        }

        let name_len = if specifier.starts_with('@') {
            let scope_end = specifier.find('/')?;
            let rest = &specifier[scope_end + 1..];
            if rest.is_empty() {
                return None;
            }
            scope_end + 1 + rest.find('/').unwrap_or(rest.len())
        } else {
            specifier.find('/').unwrap_or(specifier.len())
        };

        let name = &specifier[..name_len];
        let subpath = specifier[name_len..]
            .strip_prefix('/')
            .filter(|subpath| !subpath.is_empty());
        Some(Self { name, subpath })
    }

    /// Key into an `exports` map: `.` or `./<subpath>`.
    fn exports_key(&self) -> String {
        match self.subpath {
            Some(subpath) => format!("./{subpath}"),
            None => ".".to_string(),
        }
    }
}

/// Ordered target strings an `exports` value offers for `key`.
///
/// Arrays contribute every alternative in order; condition objects
/// contribute the branches named in `conditions`, in configured order.
pub(crate) fn exports_targets(exports: &Value, key: &str, conditions: &[String]) -> Vec<String> {
    let subpath_map = match exports {
        Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => Some(map),
        _ => None,
    };

    let Some(map) = subpath_map else {
        // String, array or bare conditions object: sugar for the "." entry.
        return if key == "." {
            expand_target(exports, conditions, None)
        } else {
            Vec::new()
        };
    };

    if let Some(value) = map.get(key) {
        return expand_target(value, conditions, None);
    }

    // Longest matching `./prefix*` pattern wins.
    let mut best: Option<(&str, &Value, &str)> = None;
    for (pattern, value) in map {
        let Some((prefix, suffix)) = pattern.split_once('*') else {
            continue;
        };
        if key.len() < prefix.len() + suffix.len()
            || !key.starts_with(prefix)
            || !key.ends_with(suffix)
        {
            continue;
        }
        let matched = &key[prefix.len()..key.len() - suffix.len()];
        if best.is_none_or(|(best_prefix, _, _)| prefix.len() > best_prefix.len()) {
            best = Some((prefix, value, matched));
        }
    }

    best.map(|(_, value, matched)| expand_target(value, conditions, Some(matched)))
        .unwrap_or_default()
}

fn expand_target(value: &Value, conditions: &[String], wildcard: Option<&str>) -> Vec<String> {
    match value {
        Value::String(target) => {
            let target = match wildcard {
                Some(matched) => target.replace('*', matched),
                None => target.clone(),
            };
            vec![target]
        }
        Value::Array(alternatives) => alternatives
            .iter()
            .flat_map(|alt| expand_target(alt, conditions, wildcard))
            .collect(),
        Value::Object(branches) => conditions
            .iter()
            .filter_map(|condition| branches.get(condition))
            .flat_map(|branch| expand_target(branch, conditions, wildcard))
            .collect(),
        _ => Vec::new(),
    }
}

impl Prober<'_> {
    /// Walk up from `start_dir` looking for `node_modules/<package>`, then
    /// resolve inside the first package found.
    pub(crate) async fn resolve_package(
        &self,
        specifier: &str,
        start_dir: &Path,
    ) -> Result<PathBuf, ResolveError> {
        let not_found = || ResolveError::not_found(specifier, start_dir);
        let package = PackageSpecifier::parse(specifier).ok_or_else(not_found)?;

        let mut current = Some(start_dir);
        while let Some(dir) = current {
            let package_dir = dir.join("node_modules").join(package.name);
            if self.runtime.is_dir(&package_dir).await {
                tracing::trace!(
                    package = package.name,
                    dir = %package_dir.display(),
                    "found package"
                );
                return self
                    .resolve_in_package(specifier, &package, &package_dir)
                    .await?
                    .ok_or_else(not_found);
            }
            current = dir.parent();
        }

        Err(not_found())
    }

    async fn resolve_in_package(
        &self,
        specifier: &str,
        package: &PackageSpecifier<'_>,
        package_dir: &Path,
    ) -> Result<Option<PathBuf>, ResolveError> {
        let manifest_path = package_dir.join("package.json");
        let manifest: Map<String, Value> = if self.runtime.is_file(&manifest_path).await {
            self.read_manifest(&manifest_path).await?
        } else {
            Map::new()
        };

        if let Some(exports) = manifest.get("exports").filter(|v| !v.is_null()) {
            let key = package.exports_key();
            for target in exports_targets(exports, &key, &self.options.conditions) {
                if !target.starts_with("./") {
                    continue;
                }
                let path = package_dir.join(&target).clean();
                if self.runtime.is_file(&path).await {
                    return Ok(Some(path));
                }
            }
            // Exported packages expose nothing outside their map.
            return Ok(None);
        }

        if let Some(subpath) = package.subpath {
            return self
                .resolve_path(specifier, &package_dir.join(subpath), None)
                .await;
        }

        for field in &self.options.main_fields {
            let Some(entry) = manifest.get(field).and_then(Value::as_str) else {
                continue;
            };
            let target = package_dir.join(entry).clean();
            if let Some(found) = self.resolve_path(specifier, &target, None).await? {
                return Ok(Some(found));
            }
        }

        self.resolve_index(specifier, package_dir, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conditions() -> Vec<String> {
        ["import", "module", "default"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn parses_package_specifiers() {
        assert_eq!(
            PackageSpecifier::parse("lodash"),
            Some(PackageSpecifier {
                name: "lodash",
                subpath: None
            })
        );
        assert_eq!(
            PackageSpecifier::parse("lodash/fp/map"),
            Some(PackageSpecifier {
                name: "lodash",
                subpath: Some("fp/map")
            })
        );
        assert_eq!(
            PackageSpecifier::parse("@scope/pkg/sub"),
            Some(PackageSpecifier {
                name: "@scope/pkg",
                subpath: Some("sub")
            })
        );
        assert_eq!(PackageSpecifier::parse("@scope"), None);
        assert_eq!(PackageSpecifier::parse("@scope/"), None);
    }

    #[test]
    fn string_exports_only_cover_the_root() {
        let exports = json!("./dist/index.js");
        assert_eq!(
            exports_targets(&exports, ".", &conditions()),
            vec!["./dist/index.js"]
        );
        assert!(exports_targets(&exports, "./sub", &conditions()).is_empty());
    }

    #[test]
    fn conditions_follow_configured_order() {
        let exports = json!({
            ".": {
                "require": "./dist/index.cjs",
                "default": "./dist/index.js",
                "import": "./dist/index.mjs"
            }
        });
        assert_eq!(
            exports_targets(&exports, ".", &conditions()),
            vec!["./dist/index.mjs", "./dist/index.js"]
        );
    }

    #[test]
    fn wildcard_subpaths_substitute() {
        let exports = json!({
            ".": "./index.js",
            "./features/*": "./src/features/*.js",
            "./features/internal/*": null
        });
        assert_eq!(
            exports_targets(&exports, "./features/a", &conditions()),
            vec!["./src/features/a.js"]
        );
        assert!(exports_targets(&exports, "./features/internal/x", &conditions()).is_empty());
    }
}
