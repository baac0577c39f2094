//! Crate-level error type.

use thiserror::Error;

use crate::cache::CacheError;
use crate::compat::CompatError;
use crate::resolver::ResolveError;

/// Errors that stop an engine call. Per-module failures are not errors at
/// this level; they are reported in [`BuildResult`](crate::BuildResult).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] howth_config::ConfigError),

    #[error(transparent)]
    Compat(#[from] CompatError),

    #[error(transparent)]
    Graph(#[from] howth_graph::GraphError),

    #[error(transparent)]
    Runtime(#[from] howth_graph::RuntimeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    ModuleId(#[from] howth_graph::ModuleIdError),

    /// The engine hit a fatal error and refuses to build until reconfigured.
    #[error("build engine failed: {reason}")]
    Failed { reason: String },

    #[error("rebuild requested before the first build")]
    NotBuilt,

    #[error("no entry points given")]
    NoEntries,
}

pub type Result<T> = std::result::Result<T, Error>;
