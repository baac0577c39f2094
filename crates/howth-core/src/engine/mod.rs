//! Incremental build engine.
//!
//! The engine owns the [`ModuleGraph`] and is its only writer. A build
//! claims every module that needs a visit, runs [`worker::visit`] for each
//! on a bounded `JoinSet`, and applies the outcomes one at a time as they
//! complete. Newly discovered modules join the queue, so the traversal ends
//! when nothing is left to visit.
//!
//! ```text
//! Idle --build--> Traversing --> Done --rebuild--> Traversing --> Done
//!                      \
//!                       +--fatal--> Failed --reconfigure--> Idle
//! ```

mod cancel;
mod diff;
mod result;
mod view;
mod worker;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use howth_config::{BuildOptions, CompatOptions, HowthConfig};
use howth_graph::{
    GraphError, Module, ModuleDiagnostic, ModuleErrorKind, ModuleGraph, ModuleId, ModuleKind,
    ModuleState, Runtime, SourceType,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::task::JoinSet;

use crate::cache::TransformCache;
use crate::compat::CompatRegistry;
use crate::error::{Error, Result};
use crate::resolver::{LookupCache, ResolveOptions, Resolver};
use crate::transform::TransformerSet;

pub use cancel::CancelToken;
pub use result::{BuildError, BuildResult, BuildStats, BuildStatus, ChangeKind};
pub use view::GraphView;

use worker::{Outcome, VisitContext};

/// Lifecycle of a [`BuildEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed or reconfigured; the next call must be `build`.
    Idle,
    Traversing,
    Done,
    /// A fatal error occurred. Only `reconfigure` leaves this state.
    Failed { reason: String },
}

#[derive(Debug)]
pub struct BuildEngine {
    options: BuildOptions,
    registry: Arc<CompatRegistry>,
    resolver: Resolver,
    runtime: Arc<dyn Runtime>,
    transformers: TransformerSet,
    cache: Arc<TransformCache>,
    graph: ModuleGraph,
    state: EngineState,
    /// Entry points as requested, re-resolved when unknown files appear.
    requested_entries: Vec<PathBuf>,
    cancel: CancelToken,
    built: bool,
}

impl BuildEngine {
    /// Engine with the standard transformers and an in-memory cache sized
    /// by the default cache options.
    pub fn new(
        options: BuildOptions,
        registry: Arc<CompatRegistry>,
        runtime: Arc<dyn Runtime>,
    ) -> Self {
        let resolver = Resolver::new(
            Arc::clone(&registry),
            Arc::clone(&runtime),
            ResolveOptions::from_build(&options),
        );
        Self {
            options,
            registry,
            resolver,
            runtime,
            transformers: TransformerSet::standard(),
            cache: Arc::new(TransformCache::default()),
            graph: ModuleGraph::new(),
            state: EngineState::Idle,
            requested_entries: Vec::new(),
            cancel: CancelToken::new(),
            built: false,
        }
    }

    /// Build an engine from loaded configuration: the registry from
    /// `[compat]`, the cache from `[cache]`.
    ///
    /// A relative `cache.dir` is resolved against `build.root`. If the
    /// persistent store cannot be opened the engine falls back to an
    /// in-memory cache.
    pub fn from_config(config: &HowthConfig, runtime: Arc<dyn Runtime>) -> Result<Self> {
        let registry = CompatRegistry::from_options(&config.compat, &config.shim_root())?;

        let mut cache_options = config.cache.clone();
        if let Some(dir) = cache_options.dir.as_mut() {
            if dir.is_relative() {
                *dir = path_clean::clean(config.build.root.join(&*dir));
            }
        }
        let cache = TransformCache::open(&cache_options).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "transform store unavailable, caching in memory only");
            TransformCache::new(&cache_options)
        });

        Ok(
            Self::new(config.build.clone(), Arc::new(registry), runtime)
                .with_cache(Arc::new(cache)),
        )
    }

    pub fn with_transformers(mut self, transformers: TransformerSet) -> Self {
        self.transformers = transformers;
        self
    }

    /// Share a transform cache, e.g. between engines for several roots.
    pub fn with_cache(mut self, cache: Arc<TransformCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<CompatRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<TransformCache> {
        &self.cache
    }

    /// Token that cancels the build in progress. Clones stay valid across
    /// builds.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Read-only view of the module graph.
    pub fn graph(&self) -> GraphView {
        GraphView::new(self.graph.clone())
    }

    /// Build the entries named in `build.entries`.
    pub async fn build_configured(&mut self) -> Result<BuildResult> {
        let entries = self.options.entries.clone();
        self.build(&entries).await
    }

    /// Full traversal from `entries`, relative to `build.root`.
    ///
    /// Every module already in the graph is revalidated (through the cache)
    /// and the result reports differences against the previous graph.
    pub async fn build<P: AsRef<Path>>(&mut self, entries: &[P]) -> Result<BuildResult> {
        self.ensure_usable()?;
        if entries.is_empty() {
            return Err(Error::NoEntries);
        }

        let started = Instant::now();
        tracing::info!(entries = entries.len(), "starting build");

        let before = diff::fingerprints(&self.graph);
        self.graph.mark_all_stale();
        self.requested_entries = entries.iter().map(|e| e.as_ref().to_path_buf()).collect();
        self.register_entries().await?;
        self.built = true;

        self.run(before, started).await
    }

    /// Revisit the modules affected by `changed` paths. Relative paths are
    /// taken against `build.root`.
    ///
    /// Paths the graph does not know may be files that were just created,
    /// so every module with an unresolved import is revisited as well.
    pub async fn rebuild<P: AsRef<Path>>(&mut self, changed: &[P]) -> Result<BuildResult> {
        self.ensure_usable()?;
        if !self.built {
            return Err(Error::NotBuilt);
        }

        let started = Instant::now();
        tracing::info!(changed = changed.len(), "starting rebuild");

        let before = diff::fingerprints(&self.graph);

        let mut unknown = false;
        let mut known = Vec::new();
        for path in changed {
            let id = ModuleId::with_base(&self.options.root, path.as_ref())?;
            if self.graph.contains(&id) {
                known.push(id);
            } else {
                unknown = true;
            }
        }

        let mut origins = known;
        if unknown {
            origins.extend(
                self.graph
                    .modules()
                    .iter()
                    .filter(|module| {
                        module
                            .diagnostics
                            .iter()
                            .any(|d| d.kind == ModuleErrorKind::NotFound)
                    })
                    .map(|module| module.id.clone()),
            );
        }
        for id in &origins {
            if let Err(err) = self.graph.invalidate(id) {
                return Err(self.fail(err));
            }
        }
        if unknown {
            self.register_entries().await?;
        }

        self.run(before, started).await
    }

    /// Install a fresh compatibility registry.
    ///
    /// Every config hash changes with the registry, so the in-memory cache
    /// is cleared and every module is marked stale. The next call must be
    /// `build`.
    pub fn reconfigure(&mut self, registry: Arc<CompatRegistry>) {
        self.resolver = Resolver::new(
            Arc::clone(&registry),
            Arc::clone(&self.runtime),
            ResolveOptions::from_build(&self.options),
        );
        self.registry = registry;
        self.cache.clear();
        self.graph.mark_all_stale();
        self.state = EngineState::Idle;
        self.built = false;
        tracing::info!(fingerprint = %self.registry.fingerprint().short(), "registry reconfigured");
    }

    /// [`reconfigure`](Self::reconfigure) from `[compat]` options. A registry
    /// that fails to load leaves the engine `Failed`.
    pub fn reconfigure_from_options(
        &mut self,
        options: &CompatOptions,
        shim_root: &Path,
    ) -> Result<()> {
        match CompatRegistry::from_options(options, shim_root) {
            Ok(registry) => {
                self.reconfigure(Arc::new(registry));
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "compat registry failed to load");
                self.state = EngineState::Failed {
                    reason: err.to_string(),
                };
                Err(err.into())
            }
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        match &self.state {
            EngineState::Failed { reason } => Err(Error::Failed {
                reason: reason.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, err: GraphError) -> Error {
        tracing::error!(error = %err, "build engine failed");
        self.state = EngineState::Failed {
            reason: err.to_string(),
        };
        err.into()
    }

    /// Resolve the requested entries and make them the graph's entry set.
    /// An entry that does not resolve becomes an errored module.
    async fn register_entries(&self) -> Result<()> {
        let root = self.options.root.clone();
        let mut ids = Vec::with_capacity(self.requested_entries.len());

        for entry in &self.requested_entries {
            match self.resolver.resolve_entry(entry, &root).await {
                Ok(path) => {
                    let id = ModuleId::new(&path)?;
                    if !self.graph.contains(&id) {
                        self.graph
                            .upsert_module(Module::placeholder(id.clone(), ModuleKind::Source));
                    }
                    ids.push(id);
                }
                Err(err) => {
                    let path = path_clean::clean(root.join(entry));
                    let id = ModuleId::new(&path)?;
                    tracing::debug!(entry = %entry.display(), error = %err, "entry not found");
                    let source_type = SourceType::from_path(&path);
                    let module = Module::builder(id.clone(), path, source_type)
                        .state(ModuleState::Error)
                        .diagnostics(vec![ModuleDiagnostic::new(err.kind(), err.to_string())])
                        .build();
                    self.graph.upsert_module(module);
                    ids.push(id);
                }
            }
        }

        self.graph.set_entry_points(&ids);
        Ok(())
    }

    async fn run(&mut self, before: diff::Fingerprints, started: Instant) -> Result<BuildResult> {
        let cache_before = self.cache.stats();
        self.state = EngineState::Traversing;

        let (status, visited) = self.traverse().await;

        let removed = if status == BuildStatus::Complete {
            self.graph.prune_unreachable()
        } else {
            Vec::new()
        };

        let after = diff::fingerprints(&self.graph);
        let changes = diff::classify(&before, &after, &self.graph);
        let errors = self.collect_errors();

        let stats = BuildStats {
            modules: self.graph.len(),
            visited,
            duration: started.elapsed(),
            cache: self.cache.stats().since(&cache_before),
        };

        self.cancel.reset();
        self.state = EngineState::Done;

        tracing::info!(
            status = ?status,
            modules = stats.modules,
            visited,
            changed = changes.len(),
            pruned = removed.len(),
            errors = errors.len(),
            elapsed_ms = stats.duration.as_millis() as u64,
            "build finished"
        );

        Ok(BuildResult {
            changes,
            errors,
            status,
            stats,
        })
    }

    /// Visit every module that needs it, following discovered edges.
    /// Returns the status and the number of modules visited.
    async fn traverse(&self) -> (BuildStatus, usize) {
        let ctx = Arc::new(VisitContext {
            runtime: Arc::clone(&self.runtime),
            resolver: self.resolver.clone(),
            transformers: self.transformers.clone(),
            cache: Arc::clone(&self.cache),
            registry_fingerprint: self.registry.fingerprint(),
            lookups: LookupCache::new(),
        });
        let parallelism = self.options.effective_parallelism();

        let mut pending: VecDeque<ModuleId> = self
            .graph
            .module_ids()
            .into_iter()
            .filter(|id| self.graph.state(id).is_some_and(ModuleState::needs_visit))
            .collect();
        let mut tasks = JoinSet::new();
        let mut running: FxHashMap<tokio::task::Id, ModuleId> = FxHashMap::default();
        let mut awaiting: FxHashSet<ModuleId> = FxHashSet::default();
        let mut visited = 0;
        let mut status = BuildStatus::Complete;

        loop {
            if self.cancel.is_cancelled() {
                status = BuildStatus::Cancelled;
                break;
            }

            while tasks.len() < parallelism {
                let Some(id) = pending.pop_front() else {
                    break;
                };
                let claimed = self.graph.transition(
                    &id,
                    &[ModuleState::Unvisited, ModuleState::Stale],
                    ModuleState::Resolving,
                );
                if !matches!(claimed, Ok(true)) {
                    continue;
                }
                let Some(module) = self.graph.module(&id) else {
                    continue;
                };
                let handle = tasks.spawn(worker::visit(
                    Arc::clone(&ctx),
                    id.clone(),
                    module.path.clone(),
                    module.source_type,
                ));
                running.insert(handle.id(), id);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            let outcome = match joined {
                Ok((task, outcome)) => {
                    running.remove(&task);
                    outcome
                }
                Err(err) => {
                    let Some(id) = running.remove(&err.id()) else {
                        continue;
                    };
                    tracing::error!(module = %id, error = %err, "module task failed");
                    Outcome::failed(
                        id,
                        ModuleErrorKind::TransformFailure,
                        format!("module task failed: {err}"),
                    )
                }
            };

            visited += 1;
            let failed = self.apply(outcome, &mut pending, &mut awaiting);
            if failed && self.options.fail_fast {
                status = BuildStatus::Aborted;
                break;
            }
        }

        if status == BuildStatus::Complete {
            self.settle(awaiting);
        } else {
            tasks.detach_all();
            self.park_unfinished();
        }

        (status, visited)
    }

    /// Record an outcome. Returns whether the module has errors.
    fn apply(
        &self,
        outcome: Outcome,
        pending: &mut VecDeque<ModuleId>,
        awaiting: &mut FxHashSet<ModuleId>,
    ) -> bool {
        for (target, kind) in &outcome.discovered {
            match self.graph.state(target) {
                None => {
                    self.graph
                        .upsert_module(Module::placeholder(target.clone(), kind.clone()));
                    pending.push_back(target.clone());
                }
                Some(state) if state.needs_visit() => pending.push_back(target.clone()),
                Some(_) => {}
            }
        }

        let failed = !outcome.diagnostics.is_empty();
        let id = outcome.id;
        let applied = self.graph.update_module(&id, |module| {
            module.content_hash = outcome.content_hash;
            module.config_hash = outcome.config_hash;
            module.specifiers = outcome.specifiers;
            module.edges = outcome.edges;
            module.artifact = outcome.artifact;
            module.diagnostics = outcome.diagnostics;
            if failed {
                module.state = ModuleState::Error;
            }
        });
        if applied.is_err() {
            // Pruned or removed while the task ran.
            return false;
        }

        if !failed {
            awaiting.insert(id);
        }
        failed
    }

    /// Mark awaiting modules `Resolved` once every module they point at is
    /// `Resolved`, treating cycles among awaiting modules as resolved.
    /// Importers of a module in `Error` (directly or through another blocked
    /// importer) stay `Stale`.
    fn settle(&self, mut awaiting: FxHashSet<ModuleId>) {
        loop {
            let blocked: Vec<ModuleId> = awaiting
                .iter()
                .filter(|id| {
                    let Some(module) = self.graph.module(id) else {
                        return true;
                    };
                    !module.module_targets().all(|target| {
                        awaiting.contains(target)
                            || self.graph.state(target) == Some(ModuleState::Resolved)
                    })
                })
                .cloned()
                .collect();
            if blocked.is_empty() {
                break;
            }
            for id in blocked {
                awaiting.remove(&id);
                if let Err(err) = self.graph.set_state(&id, ModuleState::Stale) {
                    tracing::warn!(module = %id, error = %err, "could not park blocked module");
                }
            }
        }

        for id in &awaiting {
            if let Err(err) =
                self.graph
                    .transition(id, &[ModuleState::Resolving], ModuleState::Resolved)
            {
                tracing::warn!(module = %id, error = %err, "could not mark module resolved");
            }
        }
    }

    /// After a stopped traversal, leave every unfinished module `Stale` so
    /// the next call picks it up.
    fn park_unfinished(&self) {
        for id in self.graph.module_ids() {
            if let Err(err) = self.graph.transition(
                &id,
                &[ModuleState::Unvisited, ModuleState::Resolving],
                ModuleState::Stale,
            ) {
                tracing::warn!(module = %id, error = %err, "could not park unfinished module");
            }
        }
    }

    fn collect_errors(&self) -> Vec<BuildError> {
        self.graph
            .modules()
            .iter()
            .flat_map(|module| {
                module.diagnostics.iter().map(|diagnostic| BuildError {
                    module: module.id.clone(),
                    kind: diagnostic.kind,
                    specifier: diagnostic.specifier.clone(),
                    message: diagnostic.message.clone(),
                })
            })
            .collect()
    }
}
