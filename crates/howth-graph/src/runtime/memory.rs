//! In-memory Runtime implementation.
//!
//! Holds a flat map of absolute file paths to contents. Directories are
//! implied by the files beneath them. Used for fixture trees in tests and by
//! hosts that feed the engine from an editor buffer instead of the disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

#[derive(Debug)]
pub struct MemoryRuntime {
    files: RwLock<FxHashMap<PathBuf, Arc<[u8]>>>,
    cwd: PathBuf,
    reads: AtomicUsize,
}

impl MemoryRuntime {
    /// Create an empty tree rooted at `cwd` for relative lookups.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: RwLock::new(FxHashMap::default()),
            cwd: cwd.into().clean(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Add or replace a file.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        let normalized = self.normalize(path.as_ref());
        self.files
            .write()
            .insert(normalized, Arc::from(content.as_ref()));
    }

    /// Builder-style [`add_file`](Self::add_file).
    pub fn with_file(self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> Self {
        self.add_file(path, content);
        self
    }

    /// Remove a file, returning whether it existed.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let normalized = self.normalize(path.as_ref());
        self.files.write().remove(&normalized).is_some()
    }

    /// Number of successful `read_file` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }

    fn is_implied_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize(path);
        let content = self
            .files
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(normalized))?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(content.to_vec())
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        self.add_file(path, content);
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let normalized = self.normalize(path);
        if let Some(content) = self.files.read().get(&normalized) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
                modified: None,
            });
        }
        if self.is_implied_dir(&normalized) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
                modified: None,
            });
        }
        Err(RuntimeError::FileNotFound(normalized))
    }

    async fn canonicalize(&self, path: &Path) -> RuntimeResult<PathBuf> {
        let normalized = self.normalize(path);
        if self.exists(&normalized) {
            Ok(normalized)
        } else {
            Err(RuntimeError::FileNotFound(normalized))
        }
    }

    fn exists(&self, path: &Path) -> bool {
        let normalized = self.normalize(path);
        self.files.read().contains_key(&normalized) || self.is_implied_dir(&normalized)
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directories_are_implied_by_files() {
        let runtime = MemoryRuntime::new("/proj").with_file("/proj/src/a.ts", "export {}");

        assert!(runtime.is_file(Path::new("/proj/src/a.ts")).await);
        assert!(runtime.is_dir(Path::new("/proj/src")).await);
        assert!(runtime.is_dir(Path::new("/proj")).await);
        assert!(!runtime.is_dir(Path::new("/proj/sr")).await);
        assert!(!runtime.exists(Path::new("/proj/lib")));
    }

    #[tokio::test]
    async fn relative_paths_use_cwd() {
        let runtime = MemoryRuntime::new("/proj").with_file("src/a.ts", "1");

        let content = runtime.read_file(Path::new("/proj/src/a.ts")).await.unwrap();
        assert_eq!(content, b"1");
        assert_eq!(
            runtime.canonicalize(Path::new("./src/../src/a.ts")).await.unwrap(),
            PathBuf::from("/proj/src/a.ts")
        );
        assert_eq!(runtime.read_count(), 1);
    }

    #[tokio::test]
    async fn removed_files_are_not_found() {
        let runtime = MemoryRuntime::new("/proj").with_file("/proj/a.ts", "1");
        assert!(runtime.remove("/proj/a.ts"));

        let err = runtime.read_file(Path::new("/proj/a.ts")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
