//! High-level configuration structure for howth.
//!
//! This module provides the main `HowthConfig` struct and profile merging
//! logic. For file discovery see [`discovery`](crate::discovery), for layered
//! loading see [`loading`](crate::loading).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::build::BuildOptions;
use crate::cache::CacheOptions;
use crate::compat::CompatOptions;
use crate::error::{ConfigError, Result as ConfigResult};
use crate::settings::GlobalSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HowthConfig {
    pub build: BuildOptions,
    pub cache: CacheOptions,
    pub compat: CompatOptions,
    pub settings: GlobalSettings,
    pub profiles: HashMap<String, ProfileConfig>,
}

/// Partial overrides applied by [`HowthConfig::materialize_profile`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub build: Value,
    pub cache: Value,
    pub compat: Value,
    pub settings: Value,
}

impl HowthConfig {
    /// Create from serde_json::Value (for programmatic config).
    ///
    /// # Example
    ///
    /// ```
    /// use howth_config::HowthConfig;
    /// use serde_json::json;
    /// use std::path::PathBuf;
    ///
    /// let value = json!({
    ///     "build": { "entries": ["src/index.ts"], "fail_fast": true }
    /// });
    ///
    /// let config = HowthConfig::from_value(value).unwrap();
    /// assert_eq!(config.build.entries, vec![PathBuf::from("src/index.ts")]);
    /// assert!(config.build.fail_fast);
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Deep-merge the named profile over the base sections. `None` returns the
    /// config unchanged; naming a profile that does not exist is an error.
    pub fn materialize_profile(mut self, profile: Option<&str>) -> ConfigResult<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };
        let overrides = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;

        self.build = merge_section(&self.build, &overrides.build)?;
        self.cache = merge_section(&self.cache, &overrides.cache)?;
        self.compat = merge_section(&self.compat, &overrides.compat)?;
        self.settings = merge_section(&self.settings, &overrides.settings)?;

        tracing::debug!(profile = name, "applied config profile");
        Ok(self)
    }

    /// Resolve `build.root` against the directory the config came from.
    pub fn resolve_root(&mut self, base: &Path) {
        if self.build.root.is_relative() {
            self.build.root = base.join(&self.build.root);
        }
    }

    /// Directory shim paths are resolved against.
    pub fn shim_root(&self) -> PathBuf {
        match &self.compat.shim_root {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.build.root.join(dir),
            None => self.build.root.clone(),
        }
    }
}

fn merge_section<T>(base: &T, update: &Value) -> ConfigResult<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Clone,
{
    if update.is_null() {
        return Ok(base.clone());
    }

    let mut merged = serde_json::to_value(base).map_err(|err| {
        ConfigError::InvalidProfileOverride {
            message: err.to_string(),
        }
    })?;
    merge_values(&mut merged, update);
    serde_json::from_value(merged).map_err(|err| ConfigError::InvalidProfileOverride {
        message: err.to_string(),
    })
}

/// Objects merge key by key; every other value (arrays included) replaces.
pub(crate) fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::compat::{CompatMode, CompatPreset, CompatRule};

    #[test]
    fn merge_replaces_arrays_and_merges_objects() {
        let mut base = json!({ "a": { "x": 1, "y": 2 }, "list": [1, 2] });
        merge_values(&mut base, &json!({ "a": { "y": 3 }, "list": [9] }));
        assert_eq!(base, json!({ "a": { "x": 1, "y": 3 }, "list": [9] }));
    }

    #[test]
    fn profile_overrides_only_named_fields() {
        let config = HowthConfig::from_value(json!({
            "build": { "entries": ["a.ts"], "parallelism": 2 },
            "profiles": {
                "ci": { "build": { "fail_fast": true }, "compat": { "preset": "browser" } }
            }
        }))
        .unwrap()
        .materialize_profile(Some("ci"))
        .unwrap();

        assert!(config.build.fail_fast);
        assert_eq!(config.build.parallelism, Some(2));
        assert_eq!(config.build.entries, vec![PathBuf::from("a.ts")]);
        assert_eq!(config.compat.preset, CompatPreset::Browser);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let err = HowthConfig::default()
            .materialize_profile(Some("nope"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(name) if name == "nope"));
    }

    #[test]
    fn compat_rules_accept_both_spellings() {
        let config = HowthConfig::from_value(json!({
            "compat": {
                "modules": {
                    "fs": { "shim": "shim/fs.ts" },
                    "child_process": "disallowed"
                }
            }
        }))
        .unwrap();

        assert_eq!(
            config.compat.modules["fs"],
            CompatRule::Shim {
                shim: PathBuf::from("shim/fs.ts")
            }
        );
        assert_eq!(
            config.compat.modules["child_process"],
            CompatRule::Mode(CompatMode::Disallowed)
        );
    }

    #[test]
    fn shim_root_defaults_to_project_root() {
        let mut config = HowthConfig::default();
        config.resolve_root(Path::new("/proj"));
        assert_eq!(config.shim_root(), PathBuf::from("/proj/."));

        config.compat.shim_root = Some(PathBuf::from("shims"));
        assert_eq!(config.shim_root(), PathBuf::from("/proj/./shims"));
    }
}
