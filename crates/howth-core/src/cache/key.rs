use std::fmt;

use howth_graph::{ConfigHash, ContentHash};

/// Content-addressed transform cache key.
///
/// The same bytes transformed under the same configuration always map to
/// the same key, wherever the file lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub content: ContentHash,
    pub config: ConfigHash,
}

impl CacheKey {
    pub fn new(content: ContentHash, config: ConfigHash) -> Self {
        Self { content, config }
    }

    /// `<content-hex>-<config-hex>`, the persistent store's key.
    pub fn to_hex(&self) -> String {
        format!("{}-{}", self.content.to_hex(), self.config.to_hex())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.content.short(), self.config.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_key_joins_both_digests() {
        let key = CacheKey::new(ContentHash::of(b"a"), ConfigHash::builder().field("x").finish());
        let hex = key.to_hex();
        assert_eq!(hex.len(), 64 + 1 + 64);
        assert!(hex.starts_with(&key.content.to_hex()));
        assert!(hex.ends_with(&key.config.to_hex()));
    }
}
