use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Identity of a module in the graph: its absolute, lexically cleaned path.
///
/// Construction never touches the filesystem. Callers that need symlinks
/// resolved canonicalize through a [`Runtime`](crate::Runtime) first, which keeps
/// identity stable across native and in-memory runtimes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(PathBuf);

impl ModuleId {
    /// Create an identifier from a path, joining relative paths onto the
    /// process working directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ModuleIdError> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }

        if path.is_absolute() {
            return Ok(Self(path.clean()));
        }

        let cwd = std::env::current_dir().map_err(|source| ModuleIdError::CurrentDir { source })?;
        Ok(Self(cwd.join(path).clean()))
    }

    /// Create an identifier relative to an explicit base directory.
    pub fn with_base(base: &Path, path: impl AsRef<Path>) -> Result<Self, ModuleIdError> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }

        if path.is_absolute() {
            Ok(Self(path.clean()))
        } else {
            Self::new(base.join(path))
        }
    }

    /// Returns the underlying path representation.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consume the identifier and return the owned path.
    pub fn into_path(self) -> PathBuf {
        self.0
    }

    /// Borrow the identifier as a string for logging/serialization.
    pub fn path_string(&self) -> Cow<'_, str> {
        self.0.to_string_lossy()
    }

    /// Lowercase file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.0
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_string())
    }
}

impl AsRef<Path> for ModuleId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Serialize for ModuleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.path_string())
    }
}

impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(ModuleId(PathBuf::from(value)))
    }
}

/// Error type for `ModuleId` construction failures.
#[derive(Debug, Error)]
pub enum ModuleIdError {
    /// The provided path was empty.
    #[error("module id path is empty")]
    EmptyPath,

    /// Failed to resolve the current working directory for a relative path.
    #[error("failed to resolve current directory: {source}")]
    CurrentDir {
        #[source]
        source: io::Error,
    },
}
