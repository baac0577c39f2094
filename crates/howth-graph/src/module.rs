use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Artifact, ConfigHash, ContentHash, ModuleId};

/// A node in the module graph.
///
/// The module owns its outgoing edges. The artifact is shared with the
/// transform cache through an `Arc`, so cache eviction never invalidates a
/// module that already holds its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub path: PathBuf,
    pub kind: ModuleKind,
    pub source_type: SourceType,
    pub state: ModuleState,
    pub is_entry: bool,
    pub content_hash: Option<ContentHash>,
    pub config_hash: Option<ConfigHash>,
    /// Outgoing specifiers as written in the source, in order of appearance.
    pub specifiers: Vec<String>,
    pub edges: Vec<Edge>,
    pub artifact: Option<Arc<Artifact>>,
    pub diagnostics: Vec<ModuleDiagnostic>,
}

impl Module {
    /// Create a new module builder.
    pub fn builder(id: ModuleId, path: PathBuf, source_type: SourceType) -> ModuleBuilder {
        ModuleBuilder {
            module: Self {
                id,
                path,
                kind: ModuleKind::Source,
                source_type,
                state: ModuleState::Unvisited,
                is_entry: false,
                content_hash: None,
                config_hash: None,
                specifiers: Vec::new(),
                edges: Vec::new(),
                artifact: None,
                diagnostics: Vec::new(),
            },
        }
    }

    /// Unvisited placeholder for a module discovered through an edge.
    pub fn placeholder(id: ModuleId, kind: ModuleKind) -> Self {
        let path = id.as_path().to_path_buf();
        let source_type = SourceType::from_path(&path);
        Self::builder(id, path, source_type).kind(kind).build()
    }

    pub fn dialect(&self) -> Dialect {
        self.source_type.dialect()
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Ids of modules this module points at, in edge order.
    pub fn module_targets(&self) -> impl Iterator<Item = &ModuleId> {
        self.edges.iter().filter_map(|edge| edge.target.as_module())
    }
}

/// Builder for [`Module`].
#[derive(Debug)]
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn kind(mut self, kind: ModuleKind) -> Self {
        self.module.kind = kind;
        self
    }

    pub fn state(mut self, state: ModuleState) -> Self {
        self.module.state = state;
        self
    }

    pub fn entry(mut self, is_entry: bool) -> Self {
        self.module.is_entry = is_entry;
        self
    }

    pub fn content_hash(mut self, hash: ContentHash) -> Self {
        self.module.content_hash = Some(hash);
        self
    }

    pub fn config_hash(mut self, hash: ConfigHash) -> Self {
        self.module.config_hash = Some(hash);
        self
    }

    pub fn specifiers(mut self, specifiers: Vec<String>) -> Self {
        self.module.specifiers = specifiers;
        self
    }

    pub fn edges(mut self, edges: Vec<Edge>) -> Self {
        self.module.edges = edges;
        self
    }

    pub fn artifact(mut self, artifact: Arc<Artifact>) -> Self {
        self.module.artifact = Some(artifact);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Vec<ModuleDiagnostic>) -> Self {
        self.module.diagnostics = diagnostics;
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

/// How a module entered the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModuleKind {
    /// Ordinary source file.
    Source,
    /// Substitute module standing in for a host built-in.
    Shim { builtin: String },
}

/// Lifecycle of a module within the incremental build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Unvisited,
    Resolving,
    Resolved,
    Stale,
    Error,
}

impl ModuleState {
    /// Module must be (re)visited by the next traversal.
    pub fn needs_visit(self) -> bool {
        matches!(self, Self::Unvisited | Self::Stale)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
            Self::Stale => "stale",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved import from one module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Raw specifier as written by the importer.
    pub specifier: String,
    pub target: EdgeTarget,
}

impl Edge {
    pub fn new(specifier: impl Into<String>, target: EdgeTarget) -> Self {
        Self {
            specifier: specifier.into(),
            target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EdgeTarget {
    Module(ModuleId),
    /// Built-in left to the host runtime.
    Builtin(String),
    Unresolved,
}

impl EdgeTarget {
    pub fn as_module(&self) -> Option<&ModuleId> {
        match self {
            Self::Module(id) => Some(id),
            _ => None,
        }
    }
}

/// Category of a per-module failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleErrorKind {
    NotFound,
    AmbiguousExtension,
    UnsupportedBuiltin,
    TransformFailure,
}

impl ModuleErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AmbiguousExtension => "ambiguous_extension",
            Self::UnsupportedBuiltin => "unsupported_builtin",
            Self::TransformFailure => "transform_failure",
        }
    }
}

impl fmt::Display for ModuleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure recorded against a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDiagnostic {
    pub kind: ModuleErrorKind,
    /// Specifier that failed to resolve; `None` for whole-module failures.
    pub specifier: Option<String>,
    pub message: String,
}

impl ModuleDiagnostic {
    pub fn new(kind: ModuleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            specifier: None,
            message: message.into(),
        }
    }

    pub fn with_specifier(mut self, specifier: impl Into<String>) -> Self {
        self.specifier = Some(specifier.into());
        self
    }
}

/// Source file type derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
    Json,
    Css,
    Unknown,
}

impl SourceType {
    /// Derive the source type from a file extension string.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "mts" | "cts" => Self::TypeScript,
            "jsx" => Self::Jsx,
            "tsx" => Self::Tsx,
            "json" => Self::Json,
            "css" => Self::Css,
            _ => Self::Unknown,
        }
    }

    /// Attempt to infer the source type from a file path.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, |ext| {
                Self::from_extension(&ext.to_ascii_lowercase())
            })
    }

    /// Returns true if the file is JavaScript/TypeScript based.
    pub fn is_javascript_like(&self) -> bool {
        matches!(
            self,
            Self::JavaScript | Self::TypeScript | Self::Jsx | Self::Tsx
        )
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Self::JavaScript => Dialect::Script,
            Self::TypeScript => Dialect::TypedScript,
            Self::Jsx | Self::Tsx => Dialect::Markup,
            Self::Json => Dialect::Data,
            Self::Css | Self::Unknown => Dialect::Other,
        }
    }
}

/// Language family a transformer is chosen by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `.js`, `.mjs`, `.cjs`
    Script,
    /// `.ts`, `.mts`, `.cts`
    TypedScript,
    /// Markup embedded in script: `.jsx`, `.tsx`
    Markup,
    /// `.json`
    Data,
    Other,
}

impl Dialect {
    pub fn from_extension(ext: &str) -> Self {
        SourceType::from_extension(ext).dialect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::TypedScript => "typed-script",
            Self::Markup => "markup",
            Self::Data => "data",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialects_group_extensions() {
        assert_eq!(Dialect::from_extension("mts"), Dialect::TypedScript);
        assert_eq!(Dialect::from_extension("cjs"), Dialect::Script);
        assert_eq!(Dialect::from_extension("tsx"), Dialect::Markup);
        assert_eq!(Dialect::from_extension("json"), Dialect::Data);
        assert_eq!(Dialect::from_extension("wasm"), Dialect::Other);
    }

    #[test]
    fn placeholder_infers_source_type() {
        let id = ModuleId::new("/proj/shim/fs.ts").unwrap();
        let module = Module::placeholder(
            id,
            ModuleKind::Shim {
                builtin: "fs".into(),
            },
        );
        assert_eq!(module.source_type, SourceType::TypeScript);
        assert_eq!(module.state, ModuleState::Unvisited);
        assert!(!module.has_errors());
    }

    #[test]
    fn module_targets_skip_builtins() {
        let a = ModuleId::new("/proj/a.ts").unwrap();
        let b = ModuleId::new("/proj/b.ts").unwrap();
        let module = Module::builder(a.clone(), a.as_path().into(), SourceType::TypeScript)
            .edges(vec![
                Edge::new("./b", EdgeTarget::Module(b.clone())),
                Edge::new("node:path", EdgeTarget::Builtin("path".into())),
                Edge::new("./missing", EdgeTarget::Unresolved),
            ])
            .build();
        assert_eq!(module.module_targets().collect::<Vec<_>>(), vec![&b]);
    }
}
