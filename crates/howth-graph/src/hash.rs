//! BLAKE3 fingerprints for module content and transform configuration.

use std::fmt;

use blake3::Hasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! digest_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw digest bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex rendering (64 chars).
            pub fn to_hex(&self) -> String {
                blake3::Hash::from_bytes(self.0).to_hex().to_string()
            }

            /// Parse a hex rendering produced by [`Self::to_hex`].
            pub fn from_hex(hex: &str) -> Option<Self> {
                blake3::Hash::from_hex(hex).ok().map(|hash| Self(*hash.as_bytes()))
            }

            /// First 8 hex chars, for logs.
            pub fn short(&self) -> String {
                let mut hex = self.to_hex();
                hex.truncate(8);
                hex
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let hex = String::deserialize(deserializer)?;
                Self::from_hex(&hex).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid {} '{hex}'", stringify!($name)))
                })
            }
        }
    };
}

digest_type!(
    /// Fingerprint of a file's bytes.
    ContentHash
);

digest_type!(
    /// Fingerprint of everything besides file content that shapes an artifact.
    ConfigHash
);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }
}

impl ConfigHash {
    pub fn builder() -> ConfigHasher {
        ConfigHasher::default()
    }
}

/// Incremental builder for [`ConfigHash`].
///
/// Each field is length-delimited by a `\0` separator so that
/// `("ab", "c")` and `("a", "bc")` hash differently.
#[derive(Default)]
pub struct ConfigHasher {
    hasher: Hasher,
}

impl ConfigHasher {
    pub fn field(mut self, value: impl AsRef<[u8]>) -> Self {
        self.hasher.update(value.as_ref());
        self.hasher.update(b"\0");
        self
    }

    pub fn finish(self) -> ConfigHash {
        ConfigHash(*self.hasher.finalize().as_bytes())
    }
}
