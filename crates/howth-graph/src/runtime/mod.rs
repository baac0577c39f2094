//! Platform runtime abstraction.
//!
//! Every filesystem access made while building goes through [`Runtime`], so
//! the resolver and the build engine run unchanged against the real disk
//! ([`NativeRuntime`](native::NativeRuntime)) or an in-memory tree
//! ([`MemoryRuntime`](memory::MemoryRuntime)).

#[cfg(not(target_family = "wasm"))]
pub mod native;

pub mod memory;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Runtime error: {0}")]
    Other(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_))
    }
}

#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
    /// Milliseconds since the Unix epoch, when the platform reports it.
    pub modified: Option<u64>,
}

#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()>;

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Resolve symlinks and relative components. Paths that do not exist are
    /// an error.
    async fn canonicalize(&self, path: &Path) -> RuntimeResult<PathBuf>;

    fn exists(&self, path: &Path) -> bool;

    fn get_cwd(&self) -> RuntimeResult<PathBuf>;

    async fn is_file(&self, path: &Path) -> bool {
        self.metadata(path)
            .await
            .map(|meta| meta.is_file)
            .unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.metadata(path)
            .await
            .map(|meta| meta.is_dir)
            .unwrap_or(false)
    }
}
