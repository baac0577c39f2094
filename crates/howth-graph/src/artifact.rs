use serde::{Deserialize, Serialize};

use super::SourceType;

/// Output of transforming one file.
///
/// Artifacts are immutable once produced; the transform cache and every
/// module holding one share the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Transformed code.
    pub code: String,
    /// Dependency specifiers discovered in the source, unresolved, in order
    /// of first appearance.
    pub specifiers: Vec<String>,
    pub source_type: SourceType,
}

impl Artifact {
    pub fn new(code: impl Into<String>, specifiers: Vec<String>, source_type: SourceType) -> Self {
        Self {
            code: code.into(),
            specifiers,
            source_type,
        }
    }

    /// Approximate retained size, used for cache capacity accounting.
    pub fn byte_size(&self) -> usize {
        self.code.len() + self.specifiers.iter().map(String::len).sum::<usize>()
    }
}
