//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation (for
//! library use where sources may live in memory).

#![allow(clippy::disallowed_methods)]

use crate::compat::CompatRule;
use crate::config::HowthConfig;
use crate::error::{ConfigError, Result};

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    fn validate(&self, config: &HowthConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use howth_config::{ConfigValidator, HowthConfig, SchemaValidator};
///
/// let mut config = HowthConfig::default();
/// config.build.entries = vec!["src/index.ts".into()];
///
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &HowthConfig) -> Result<()> {
        let build = &config.build;

        if build.entries.is_empty() {
            return Err(ConfigError::NoEntries);
        }
        if build.entries.iter().any(|entry| entry.as_os_str().is_empty()) {
            return Err(ConfigError::schema(
                "entry paths cannot be empty",
                "Remove empty strings from [build] entries",
            ));
        }

        if build.extensions.is_empty() {
            return Err(ConfigError::schema(
                "at least one extension is required",
                "Restore the default extensions list or add e.g. \"ts\"",
            ));
        }
        if let Some(ext) = build
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(ConfigError::schema(
                format!("invalid extension '{ext}'"),
                "Write extensions without a leading dot, e.g. \"ts\"",
            ));
        }
        if let Some(ext) = build
            .extension_priority
            .iter()
            .find(|ext| !build.extensions.contains(ext))
        {
            return Err(ConfigError::schema(
                format!("extension_priority lists '{ext}' which is not in extensions"),
                "Only rank extensions that are probed",
            ));
        }

        if build.parallelism == Some(0) {
            return Err(ConfigError::schema(
                "parallelism must be at least 1",
                "Omit parallelism to use every available core",
            ));
        }

        if config.cache.max_entries == 0 {
            return Err(ConfigError::schema(
                "cache max_entries must be at least 1",
                "Use a small value such as 100 to keep the cache tiny",
            ));
        }

        for (name, rule) in &config.compat.modules {
            if name.trim().is_empty() {
                return Err(ConfigError::schema(
                    "compat module names cannot be empty",
                    "Name the built-in, e.g. fs or node:fs",
                ));
            }
            if let CompatRule::Shim { shim } = rule {
                if shim.as_os_str().is_empty() {
                    return Err(ConfigError::schema(
                        format!("shim path for '{name}' cannot be empty"),
                        "Point the shim at a file, e.g. { shim = \"shim/fs.ts\" }",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Filesystem validator (for CLI use)
///
/// Runs schema validation, then checks that the root, every entry and every
/// shim exist on disk.
pub struct FsValidator;

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &HowthConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        let root = &config.build.root;
        if !root.is_dir() {
            return Err(ConfigError::RootNotFound { path: root.clone() });
        }

        for entry in &config.build.entries {
            let path = root.join(entry);
            if !path.exists() {
                return Err(ConfigError::EntryNotFound { path });
            }
        }

        let shim_root = config.shim_root();
        for (name, rule) in &config.compat.modules {
            if let CompatRule::Shim { shim } = rule {
                let path = shim_root.join(shim);
                if !path.is_file() {
                    return Err(ConfigError::ShimNotFound {
                        builtin: name.clone(),
                        path,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Validate config schema only (no filesystem checks)
pub fn validate_schema(config: &HowthConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

/// Validate config with filesystem checks
pub fn validate_fs(config: &HowthConfig) -> Result<()> {
    FsValidator.validate(config)
}
