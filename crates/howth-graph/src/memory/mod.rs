//! In-memory `ModuleGraph` implementation.
//!
//! Operations are grouped by concern, each file adding an `impl ModuleGraph`
//! block: construction in [`graph`], edits in [`mutations`], upward staleness
//! propagation in [`invalidation`], read access in [`queries`], reachability
//! in [`traversal`] and export formats in [`serialization`].

mod graph;
mod invalidation;
mod mutations;
mod queries;
mod serialization;
mod traversal;

pub use graph::ModuleGraph;
pub use serialization::{GraphSnapshot, ModuleSnapshot};
