//! Global configuration settings shared across profiles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// `silent`, `error`, `warn`, `info` or `debug`.
    pub log_level: Option<String>,

    /// Emit per-module tracing spans.
    pub trace: bool,
}
