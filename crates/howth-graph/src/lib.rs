//! # howth-graph
//!
//! Module dependency graph primitives for howth's incremental builds.
//!
//! The crate holds the durable state of a build: which modules exist, what
//! each one imports, what the transform produced for it and whether it is
//! still valid. It performs no resolution or transformation itself; those
//! live in `howth-core`, which drives this graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ModuleGraph                  │
//! │   Arc<RwLock<..>>, cheap to clone and share  │
//! └──────────────┬──────────────────┬────────────┘
//!                │                  │
//!                ▼                  ▼
//!        ┌──────────────┐   ┌────────────────┐
//!        │    Module    │   │ reverse index  │
//!        │ owns Edges,  │   │ importee ->    │
//!        │ Artifact     │   │ importers      │
//!        └──────────────┘   └────────────────┘
//! ```
//!
//! Edges are owned by the importing module. The reverse index is a
//! non-owning back reference used to propagate staleness upward when a file
//! changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use howth_graph::{Edge, EdgeTarget, Module, ModuleGraph, ModuleId, ModuleState, SourceType};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = ModuleGraph::new();
//!
//! let a = ModuleId::new("/proj/a.ts")?;
//! let b = ModuleId::new("/proj/b.ts")?;
//! graph.upsert_module(
//!     Module::builder(a.clone(), PathBuf::from("/proj/a.ts"), SourceType::TypeScript)
//!         .state(ModuleState::Resolved)
//!         .edges(vec![Edge::new("./b", EdgeTarget::Module(b.clone()))])
//!         .build(),
//! );
//! graph.upsert_module(
//!     Module::builder(b.clone(), PathBuf::from("/proj/b.ts"), SourceType::TypeScript)
//!         .state(ModuleState::Resolved)
//!         .build(),
//! );
//!
//! // b changed on disk: b and everything importing it must be revisited
//! let staled = graph.invalidate(&b)?;
//! assert_eq!(staled, vec![a, b]);
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod external_dep;
pub mod hash;
pub mod module;
pub mod module_id;
pub mod runtime;
pub mod statistics;

mod memory;


pub use artifact::Artifact;
pub use external_dep::BuiltinDependency;
pub use hash::{ConfigHash, ConfigHasher, ContentHash};
pub use memory::{GraphSnapshot, ModuleGraph, ModuleSnapshot};
pub use module::{
    Dialect, Edge, EdgeTarget, Module, ModuleBuilder, ModuleDiagnostic, ModuleErrorKind,
    ModuleKind, ModuleState, SourceType,
};
pub use module_id::{ModuleId, ModuleIdError};
pub use statistics::GraphStatistics;

pub use runtime::memory::MemoryRuntime;
#[cfg(not(target_family = "wasm"))]
pub use runtime::native::NativeRuntime;
pub use runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Error type for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("module not found in graph: {0}")]
    ModuleNotFound(ModuleId),

    /// Staleness propagation visited more modules than the graph holds.
    /// Indicates a corrupted reverse index.
    #[error(
        "invalidation from {origin} visited {visited} modules, more than the graph contains"
    )]
    CyclicInvalidationOverflow { origin: ModuleId, visited: usize },

    #[error(transparent)]
    ModuleId(#[from] ModuleIdError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
