//! File-based config discovery.
//!
//! Handles finding and loading howth configuration files from the
//! filesystem. Runs before any build `Runtime` exists, so it reads the disk
//! directly.

#![allow(clippy::disallowed_methods)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::HowthConfig;
use crate::error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "howth.toml";
pub const PACKAGE_JSON_FIELD: &str = "howth";

/// Where a configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Toml(PathBuf),
    /// `package.json` with a non-null `howth` field.
    PackageJson(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Toml(path) | Self::PackageJson(path) => path,
        }
    }
}

/// File-based configuration discovery
///
/// # Example
///
/// ```no_run
/// use howth_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let config = discovery.load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    /// Create a new config discovery with a root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. `howth.toml`
    /// 2. `package.json` (`howth` field)
    pub fn find(&self) -> Option<ConfigSource> {
        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.is_file() {
            return Some(ConfigSource::Toml(toml_path));
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed = serde_json::from_str::<Value>(&content).ok()?;
        match parsed.get(PACKAGE_JSON_FIELD) {
            Some(value) if !value.is_null() => Some(ConfigSource::PackageJson(pkg_path)),
            _ => None,
        }
    }

    /// Load config from the discovered file, without environment layering.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<HowthConfig> {
        let source = self.find().ok_or(ConfigError::NotFound)?;
        let value = read_source(&source)?;
        let mut config = HowthConfig::from_value(value)?;
        config.resolve_root(&self.root);
        Ok(config)
    }

    /// Load config with profile merging
    pub fn load_with_profile(&self, profile: &str) -> Result<HowthConfig> {
        self.load()?.materialize_profile(Some(profile))
    }
}

/// Read a config source into a JSON value.
pub(crate) fn read_source(source: &ConfigSource) -> Result<Value> {
    match source {
        ConfigSource::Toml(path) => {
            let content = fs::read_to_string(path)?;
            let toml_val: toml::Value =
                toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                    field: "toml".to_string(),
                    hint: Some(format!("Invalid TOML syntax: {e}")),
                })?;
            serde_json::to_value(toml_val).map_err(|e| ConfigError::InvalidValue {
                field: "toml".to_string(),
                hint: Some(format!("TOML to JSON conversion failed: {e}")),
            })
        }
        ConfigSource::PackageJson(path) => {
            let content = fs::read_to_string(path)?;
            let mut parsed: Value =
                serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                    field: "package.json".to_string(),
                    hint: Some(format!("Invalid JSON: {e}")),
                })?;
            match parsed.get_mut(PACKAGE_JSON_FIELD).map(Value::take) {
                Some(value) if !value.is_null() => Ok(value),
                _ => Err(ConfigError::InvalidValue {
                    field: PACKAGE_JSON_FIELD.to_string(),
                    hint: Some("Add a 'howth' object to your package.json".to_string()),
                }),
            }
        }
    }
}

/// Discover and load config from the current directory.
pub fn discover() -> Result<HowthConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load()
}

/// Discover and load config with a profile from the current directory.
pub fn discover_with_profile(profile: &str) -> Result<HowthConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load_with_profile(profile)
}
