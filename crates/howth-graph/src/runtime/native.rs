//! Native Runtime Implementation
//!
//! `std::fs` wrapped in the [`Runtime`] trait. Blocking calls run on tokio's
//! blocking pool via `spawn_blocking` so they never stall build workers.

// NativeRuntime is platform-specific and wraps std::fs
#![allow(clippy::disallowed_methods)]

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::task;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Native filesystem Runtime implementation using `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(path: &Path, action: &str, e: io::Error) -> RuntimeError {
    if e.kind() == io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(format!("Failed to {action} {}: {e}", path.display()))
    }
}

fn join_error(e: task::JoinError) -> RuntimeError {
    RuntimeError::Other(format!("Task join error: {e}"))
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();
        task::spawn_blocking(move || std::fs::read(&path).map_err(|e| map_io(&path, "read", e)))
            .await
            .map_err(join_error)?
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        let content = content.to_vec();
        task::spawn_blocking(move || {
            std::fs::write(&path, content).map_err(|e| map_io(&path, "write", e))
        })
        .await
        .map_err(join_error)?
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let path = path.to_path_buf();
        task::spawn_blocking(move || {
            let metadata =
                std::fs::metadata(&path).map_err(|e| map_io(&path, "get metadata for", e))?;

            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64);

            Ok(FileMetadata {
                size: metadata.len(),
                is_dir: metadata.is_dir(),
                is_file: metadata.is_file(),
                modified,
            })
        })
        .await
        .map_err(join_error)?
    }

    async fn canonicalize(&self, path: &Path) -> RuntimeResult<PathBuf> {
        let path = path.to_path_buf();
        task::spawn_blocking(move || {
            std::fs::canonicalize(&path).map_err(|e| map_io(&path, "canonicalize", e))
        })
        .await
        .map_err(join_error)?
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        std::env::current_dir().map_err(|e| RuntimeError::Io(format!("Failed to get cwd: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_and_reports_missing_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        std::fs::write(&file, "export {}").unwrap();

        let runtime = NativeRuntime::new();
        assert_eq!(runtime.read_file(&file).await.unwrap(), b"export {}");
        assert!(runtime.is_file(&file).await);
        assert!(runtime.is_dir(dir.path()).await);

        let missing = runtime.read_file(&dir.path().join("b.ts")).await;
        assert!(matches!(missing, Err(RuntimeError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn canonicalize_resolves_parent_components() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("a.ts"), "").unwrap();

        let runtime = NativeRuntime::new();
        let canonical = runtime
            .canonicalize(&dir.path().join("src/../a.ts"))
            .await
            .unwrap();
        let expected = std::fs::canonicalize(dir.path().join("a.ts")).unwrap();
        assert_eq!(canonical, expected);
    }
}
