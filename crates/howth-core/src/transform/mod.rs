//! Source transformation, polymorphic over dialect.
//!
//! A [`Transformer`] turns one file's source into an [`Artifact`]: emitted
//! code plus the runtime specifiers it imports. The engine picks the first
//! transformer in its [`TransformerSet`] that supports the module's
//! [`Dialect`].

mod json;
mod script;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use howth_graph::{Artifact, ConfigHash, Dialect, SourceType};

pub use json::JsonTransformer;
pub use script::ScriptTransformer;

/// A transform failure, cached as a negative result and recorded on the
/// module as `TransformFailure`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to transform {}: {message}", path.display())]
pub struct TransformError {
    pub path: PathBuf,
    pub message: String,
}

impl TransformError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Input to [`Transformer::transform`].
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub path: PathBuf,
    pub source: Arc<str>,
    pub source_type: SourceType,
}

#[async_trait]
pub trait Transformer: Send + Sync + fmt::Debug {
    /// Stable identifier, part of every config hash this transformer
    /// contributes to.
    fn name(&self) -> &'static str;

    /// Digest of the transformer's version and options. Changing it
    /// invalidates every artifact the transformer produced.
    fn fingerprint(&self) -> ConfigHash;

    fn supports(&self, dialect: Dialect) -> bool;

    async fn transform(&self, request: &TransformRequest) -> Result<Artifact, TransformError>;
}

/// Ordered transformer list; the first match for a dialect wins.
#[derive(Debug, Clone, Default)]
pub struct TransformerSet {
    transformers: Vec<Arc<dyn Transformer>>,
}

impl TransformerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script (JS, TS, JSX, TSX) through oxc, then JSON.
    pub fn standard() -> Self {
        Self::new()
            .with(Arc::new(ScriptTransformer::default()))
            .with(Arc::new(JsonTransformer))
    }

    pub fn with(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn for_dialect(&self, dialect: Dialect) -> Option<&Arc<dyn Transformer>> {
        self.transformers.iter().find(|t| t.supports(dialect))
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Config hash for modules of `dialect`: the chosen transformer's name
    /// and fingerprint, the dialect and the compat registry fingerprint.
    /// `None` when no transformer handles the dialect.
    pub fn config_hash(&self, dialect: Dialect, registry: ConfigHash) -> Option<ConfigHash> {
        let transformer = self.for_dialect(dialect)?;
        Some(
            ConfigHash::builder()
                .field(transformer.name())
                .field(transformer.fingerprint().as_bytes())
                .field(dialect.as_str())
                .field(registry.as_bytes())
                .finish(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_set_covers_scripts_and_data() {
        let set = TransformerSet::standard();
        assert_eq!(set.for_dialect(Dialect::Script).map(|t| t.name()), Some("script"));
        assert_eq!(set.for_dialect(Dialect::TypedScript).map(|t| t.name()), Some("script"));
        assert_eq!(set.for_dialect(Dialect::Markup).map(|t| t.name()), Some("script"));
        assert_eq!(set.for_dialect(Dialect::Data).map(|t| t.name()), Some("json"));
        assert!(set.for_dialect(Dialect::Other).is_none());
    }

    #[test]
    fn config_hash_depends_on_dialect_and_registry() {
        let set = TransformerSet::standard();
        let registry_a = ConfigHash::builder().field("a").finish();
        let registry_b = ConfigHash::builder().field("b").finish();

        let ts = set.config_hash(Dialect::TypedScript, registry_a);
        assert!(ts.is_some());
        assert_ne!(ts, set.config_hash(Dialect::Script, registry_a));
        assert_ne!(ts, set.config_hash(Dialect::TypedScript, registry_b));
        assert_eq!(ts, set.config_hash(Dialect::TypedScript, registry_a));
        assert_eq!(set.config_hash(Dialect::Other, registry_a), None);
    }
}
