use serde::{Deserialize, Serialize};

use super::ModuleId;

/// A host built-in left to the runtime, together with the modules importing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinDependency {
    pub name: String,
    pub importers: Vec<ModuleId>,
}

impl BuiltinDependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            importers: Vec::new(),
        }
    }

    pub fn push_importer(&mut self, importer: ModuleId) {
        if !self.importers.contains(&importer) {
            self.importers.push(importer);
        }
    }
}
