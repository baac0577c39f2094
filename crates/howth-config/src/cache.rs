//! `[cache]` section: transform cache capacity and persistence.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_MAX_BYTES: u64 = 256 * 1024 * 1024;
pub const DEFAULT_NEGATIVE_TTL_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    pub max_entries: usize,
    pub max_bytes: u64,
    /// How long a failed transform is remembered before retrying.
    pub negative_ttl_ms: u64,
    /// Directory for the persistent artifact store. `None` keeps the cache
    /// in memory only.
    pub dir: Option<PathBuf>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
            negative_ttl_ms: DEFAULT_NEGATIVE_TTL_MS,
            dir: None,
        }
    }
}

impl CacheOptions {
    pub fn negative_ttl(&self) -> Duration {
        Duration::from_millis(self.negative_ttl_ms)
    }
}
