#![cfg_attr(docsrs, feature(doc_cfg))]

//! # howth-core
//!
//! Resolution, Node.js compatibility, transform caching and the incremental
//! build engine on top of [`howth_graph`].
//!
//! ```text
//! changed paths ──▶ BuildEngine ──▶ ModuleGraph (invalidate / revisit)
//!                       │
//!                       ├──▶ Resolver ──▶ CompatRegistry (built-ins)
//!                       └──▶ TransformCache ──▶ Transformer (oxc, JSON)
//!                                   │
//!                                   ▼
//!                              BuildResult (added / removed / changed)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use howth_core::{BuildEngine, CompatRegistry, NativeRuntime};
//! use howth_config::BuildOptions;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = BuildOptions {
//!     root: "./app".into(),
//!     ..BuildOptions::default()
//! };
//! let mut engine = BuildEngine::new(
//!     options,
//!     Arc::new(CompatRegistry::browser()),
//!     Arc::new(NativeRuntime::new()),
//! );
//!
//! let first = engine.build(&["src/index.ts"]).await?;
//! for error in &first.errors {
//!     eprintln!("{error}");
//! }
//!
//! // Later, when the watcher reports a change:
//! let next = engine.rebuild(&["./app/src/util.ts"]).await?;
//! println!("{} modules changed", next.changes.len());
//! # Ok(()) }
//! ```

pub mod cache;
pub mod compat;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod transform;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use howth_graph::{
    Artifact, Edge, EdgeTarget, MemoryRuntime, Module, ModuleDiagnostic, ModuleErrorKind,
    ModuleGraph, ModuleId, ModuleKind, ModuleState, Runtime, SourceType,
};
#[cfg(not(target_family = "wasm"))]
pub use howth_graph::NativeRuntime;

pub use cache::{CacheKey, CacheStats, TransformCache};
pub use compat::{CompatEntry, CompatError, CompatLookup, CompatRegistry};
pub use engine::{
    BuildEngine, BuildError, BuildResult, BuildStats, BuildStatus, CancelToken, ChangeKind,
    EngineState, GraphView,
};
pub use error::{Error, Result};
pub use resolver::{LookupCache, ResolveError, ResolveOptions, ResolvedTarget, Resolver};
pub use transform::{
    JsonTransformer, ScriptTransformer, TransformError, TransformRequest, Transformer,
    TransformerSet,
};
