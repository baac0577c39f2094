//! Layered loading through figment.
//!
//! Priority, lowest first: built-in defaults, the discovered (or explicit)
//! config file, then `HOWTH_`-prefixed environment variables where `__`
//! separates nesting levels (`HOWTH_BUILD__FAIL_FAST=true`).

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};

use crate::config::HowthConfig;
use crate::discovery::{ConfigDiscovery, ConfigSource, read_source};
use crate::error::{ConfigError, Result};

pub const ENV_PREFIX: &str = "HOWTH_";

/// Options for [`HowthConfig::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Config file to use instead of discovery.
    pub config_path: Option<PathBuf>,
    /// Profile merged over the base sections after layering.
    pub profile: Option<String>,
    /// Skip the environment layer.
    pub ignore_env: bool,
}

impl HowthConfig {
    /// Load configuration rooted at `root` from every layer.
    ///
    /// A missing config file is not an error here; defaults plus environment
    /// still produce a config.
    pub fn load(root: &Path, options: &LoadOptions) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(HowthConfig::default()));

        let source = match &options.config_path {
            Some(path) if path.file_name().is_some_and(|name| name == "package.json") => {
                Some(ConfigSource::PackageJson(root.join(path)))
            }
            Some(path) => Some(ConfigSource::Toml(root.join(path))),
            None => ConfigDiscovery::new(root).find(),
        };

        figment = match &source {
            Some(ConfigSource::Toml(path)) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound);
                }
                figment.merge(Toml::file(path))
            }
            Some(package_json @ ConfigSource::PackageJson(_)) => {
                figment.merge(Serialized::defaults(read_source(package_json)?))
            }
            None => figment,
        };

        if !options.ignore_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let mut config: HowthConfig = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: Some(e.to_string()),
        })?;

        let base = source
            .as_ref()
            .and_then(|source| source.path().parent())
            .unwrap_or(root);
        config.resolve_root(base);

        tracing::debug!(
            source = ?source.as_ref().map(ConfigSource::path),
            root = %config.build.root.display(),
            "loaded configuration"
        );

        config.materialize_profile(options.profile.as_deref())
    }
}
