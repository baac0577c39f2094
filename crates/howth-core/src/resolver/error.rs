use std::path::PathBuf;

use howth_graph::ModuleErrorKind;
use miette::Diagnostic;
use thiserror::Error;

/// Why a specifier could not be resolved.
///
/// Cloned into the per-build lookup cache, so every variant owns plain data.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cannot resolve '{specifier}' from {}", importer.display())]
    #[diagnostic(
        code(howth::resolve::not_found),
        help("Check the path, or install the package into node_modules")
    )]
    NotFound {
        specifier: String,
        importer: PathBuf,
    },

    #[error("'{specifier}' matches several files: {}", display_candidates(candidates))]
    #[diagnostic(
        code(howth::resolve::ambiguous_extension),
        help("Write the extension in the import, or rank extensions with build.extension_priority")
    )]
    AmbiguousExtension {
        specifier: String,
        candidates: Vec<PathBuf>,
    },

    #[error("built-in module '{name}' is not supported")]
    #[diagnostic(
        code(howth::resolve::unsupported_builtin),
        help("Provide a shim under [compat.modules], e.g. {name} = {{ shim = \"shim/{name}.ts\" }}")
    )]
    UnsupportedBuiltin { name: String },

    #[error("invalid package manifest {}: {message}", path.display())]
    #[diagnostic(code(howth::resolve::invalid_manifest))]
    InvalidManifest { path: PathBuf, message: String },
}

impl ResolveError {
    /// The error category recorded on the importing module.
    pub fn kind(&self) -> ModuleErrorKind {
        match self {
            Self::NotFound { .. } | Self::InvalidManifest { .. } => ModuleErrorKind::NotFound,
            Self::AmbiguousExtension { .. } => ModuleErrorKind::AmbiguousExtension,
            Self::UnsupportedBuiltin { .. } => ModuleErrorKind::UnsupportedBuiltin,
        }
    }

    pub(crate) fn not_found(specifier: &str, importer: &std::path::Path) -> Self {
        Self::NotFound {
            specifier: specifier.to_string(),
            importer: importer.to_path_buf(),
        }
    }
}

fn display_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
