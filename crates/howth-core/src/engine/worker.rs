//! Per-module work run on traversal tasks.
//!
//! A worker reads, hashes, transforms (through the cache) and resolves one
//! module, then hands an [`Outcome`] back to the coordinator. Workers never
//! touch the graph.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use howth_graph::{
    Artifact, ConfigHash, ContentHash, Edge, EdgeTarget, ModuleDiagnostic, ModuleErrorKind,
    ModuleId, ModuleKind, Runtime, SourceType,
};

use crate::cache::{CacheKey, TransformCache};
use crate::resolver::{LookupCache, ResolvedTarget, Resolver};
use crate::transform::{TransformRequest, TransformerSet};

/// Everything a worker needs, shared by all tasks of one traversal.
#[derive(Debug)]
pub(crate) struct VisitContext {
    pub(crate) runtime: Arc<dyn Runtime>,
    pub(crate) resolver: Resolver,
    pub(crate) transformers: TransformerSet,
    pub(crate) cache: Arc<TransformCache>,
    pub(crate) registry_fingerprint: ConfigHash,
    pub(crate) lookups: LookupCache,
}

/// What a worker learned about one module.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) id: ModuleId,
    pub(crate) content_hash: Option<ContentHash>,
    pub(crate) config_hash: Option<ConfigHash>,
    pub(crate) specifiers: Vec<String>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) artifact: Option<Arc<Artifact>>,
    pub(crate) diagnostics: Vec<ModuleDiagnostic>,
    /// Module targets of `edges`, with the kind a new placeholder gets.
    pub(crate) discovered: Vec<(ModuleId, ModuleKind)>,
}

impl Outcome {
    fn new(id: ModuleId) -> Self {
        Self {
            id,
            content_hash: None,
            config_hash: None,
            specifiers: Vec::new(),
            edges: Vec::new(),
            artifact: None,
            diagnostics: Vec::new(),
            discovered: Vec::new(),
        }
    }

    /// A whole-module failure.
    pub(crate) fn failed(id: ModuleId, kind: ModuleErrorKind, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(id);
        outcome.diagnostics.push(ModuleDiagnostic::new(kind, message));
        outcome
    }
}

/// Visit the module at `path`.
pub(crate) async fn visit(
    ctx: Arc<VisitContext>,
    id: ModuleId,
    path: PathBuf,
    source_type: SourceType,
) -> Outcome {
    let bytes = match ctx.runtime.read_file(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Outcome::failed(
                id,
                ModuleErrorKind::NotFound,
                format!("cannot read {}: {err}", path.display()),
            );
        }
    };

    let content_hash = ContentHash::of(&bytes);
    let source: Arc<str> = match String::from_utf8(bytes) {
        Ok(source) => source.into(),
        Err(_) => {
            let mut outcome = Outcome::failed(
                id,
                ModuleErrorKind::TransformFailure,
                format!("{} is not valid UTF-8", path.display()),
            );
            outcome.content_hash = Some(content_hash);
            return outcome;
        }
    };

    let dialect = source_type.dialect();
    let (Some(transformer), Some(config_hash)) = (
        ctx.transformers.for_dialect(dialect).cloned(),
        ctx.transformers.config_hash(dialect, ctx.registry_fingerprint),
    ) else {
        let mut outcome = Outcome::failed(
            id,
            ModuleErrorKind::TransformFailure,
            format!("no transformer handles {} modules", dialect.as_str()),
        );
        outcome.content_hash = Some(content_hash);
        return outcome;
    };

    let mut outcome = Outcome::new(id);
    outcome.content_hash = Some(content_hash);
    outcome.config_hash = Some(config_hash);

    let request = TransformRequest {
        path: path.clone(),
        source,
        source_type,
    };
    let key = CacheKey::new(content_hash, config_hash);
    let artifact = match ctx
        .cache
        .get_or_compute(key, || async move { transformer.transform(&request).await })
        .await
    {
        Ok(artifact) => artifact,
        Err(err) => {
            outcome.diagnostics.push(ModuleDiagnostic::new(
                ModuleErrorKind::TransformFailure,
                err.message,
            ));
            return outcome;
        }
    };

    for specifier in &artifact.specifiers {
        let target = match ctx.resolver.resolve(specifier, &path, &ctx.lookups).await {
            Ok(ResolvedTarget::File(file)) => {
                module_target(&mut outcome, specifier, &file, ModuleKind::Source)
            }
            Ok(ResolvedTarget::Shim { builtin, path: shim }) => {
                module_target(&mut outcome, specifier, &shim, ModuleKind::Shim { builtin })
            }
            Ok(ResolvedTarget::Builtin(name)) => EdgeTarget::Builtin(name),
            Err(err) => {
                outcome.diagnostics.push(
                    ModuleDiagnostic::new(err.kind(), err.to_string()).with_specifier(specifier),
                );
                EdgeTarget::Unresolved
            }
        };
        outcome.edges.push(Edge::new(specifier.clone(), target));
    }

    tracing::debug!(
        module = %outcome.id,
        edges = outcome.edges.len(),
        errors = outcome.diagnostics.len(),
        "visited module"
    );

    outcome.specifiers = artifact.specifiers.clone();
    outcome.artifact = Some(artifact);
    outcome
}

fn module_target(
    outcome: &mut Outcome,
    specifier: &str,
    path: &Path,
    kind: ModuleKind,
) -> EdgeTarget {
    match ModuleId::new(path) {
        Ok(target) => {
            if !outcome.discovered.iter().any(|(id, _)| *id == target) {
                outcome.discovered.push((target.clone(), kind));
            }
            EdgeTarget::Module(target)
        }
        Err(err) => {
            outcome.diagnostics.push(
                ModuleDiagnostic::new(ModuleErrorKind::NotFound, err.to_string())
                    .with_specifier(specifier),
            );
            EdgeTarget::Unresolved
        }
    }
}
