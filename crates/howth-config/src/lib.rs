//! Configuration for howth builds.
//!
//! A project is configured through `howth.toml` (or a `howth` field in
//! `package.json`), layered under `HOWTH_*` environment variables:
//!
//! ```toml
//! [build]
//! entries = ["src/index.ts"]
//!
//! [compat]
//! preset = "browser"
//! [compat.modules]
//! fs = { shim = "shim/fs.ts" }
//!
//! [profiles.production.build]
//! fail_fast = true
//! ```

pub mod build;
pub mod cache;
pub mod compat;
pub mod config;
pub mod discovery;
pub mod error;
pub mod loading;
pub mod settings;
pub mod validation;

pub use build::BuildOptions;
pub use cache::CacheOptions;
pub use compat::{CompatMode, CompatOptions, CompatPreset, CompatRule};
pub use config::{HowthConfig, ProfileConfig};
pub use error::{ConfigError, Result};
pub use loading::{ENV_PREFIX, LoadOptions};
pub use settings::GlobalSettings;

pub use discovery::{ConfigDiscovery, ConfigSource, discover, discover_with_profile};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
