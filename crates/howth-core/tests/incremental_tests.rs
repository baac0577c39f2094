//! Rebuilds, cancellation and reconfiguration.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use helpers::{abs, engine, id, options, project};
use howth_config::{CompatMode, CompatOptions, CompatRule};
use howth_core::{
    Artifact, BuildEngine, BuildStatus, CancelToken, ChangeKind, CompatError, CompatRegistry,
    EdgeTarget, EngineState, Error, ModuleErrorKind, ModuleState, ScriptTransformer,
    TransformError, TransformRequest, Transformer, TransformerSet,
};
use howth_graph::{ConfigHash, Dialect};

fn abc_project() -> Arc<howth_core::MemoryRuntime> {
    project(&[
        (
            "src/a.ts",
            "import { b } from \"./b\";\nexport const a = () => b;\n",
        ),
        ("src/b.ts", "export const b = 1;\n"),
        ("src/c.ts", "export const c = 3;\n"),
    ])
}

#[tokio::test]
async fn changed_module_and_importers_are_reported() {
    let runtime = abc_project();
    let mut engine = engine(&runtime, CompatRegistry::node());
    engine.build(&["src/a.ts", "src/c.ts"]).await.unwrap();

    runtime.add_file(abs("src/b.ts"), "export const b = 2;\n");
    let result = engine.rebuild(&[abs("src/b.ts")]).await.unwrap();

    assert!(result.is_complete());
    assert_eq!(result.changes.len(), 2, "{:?}", result.changes);
    assert_eq!(result.change(&id("src/a.ts")), Some(ChangeKind::Changed));
    assert_eq!(result.change(&id("src/b.ts")), Some(ChangeKind::Changed));
    assert_eq!(result.change(&id("src/c.ts")), None);
    assert_eq!(result.stats.visited, 2);

    let graph = engine.graph();
    for module in graph.modules() {
        assert_eq!(module.state, ModuleState::Resolved, "{}", module.id);
    }
}

#[tokio::test]
async fn unchanged_rebuild_reuses_the_cache() {
    let runtime = abc_project();
    let mut engine = engine(&runtime, CompatRegistry::node());
    engine.build(&["src/a.ts", "src/c.ts"]).await.unwrap();
    let reads = runtime.read_count();

    let result = engine.rebuild(&[abs("src/b.ts")]).await.unwrap();

    assert!(result.changes.is_empty());
    assert_eq!(result.stats.cache.hits, 2);
    assert_eq!(result.stats.cache.misses, 0);
    assert_eq!(runtime.read_count(), reads + 2);
}

#[tokio::test]
async fn rebuild_inside_a_cycle_terminates() {
    let runtime = project(&[
        (
            "src/a.ts",
            "import { b } from \"./b\";\nexport const a = () => b;\n",
        ),
        (
            "src/b.ts",
            "import { a } from \"./a\";\nexport const b = () => a;\n",
        ),
    ]);
    let mut engine = engine(&runtime, CompatRegistry::node());
    engine.build(&["src/a.ts"]).await.unwrap();

    runtime.add_file(
        abs("src/b.ts"),
        "import { a } from \"./a\";\nexport const b = () => [a];\n",
    );
    let result = engine.rebuild(&[abs("src/b.ts")]).await.unwrap();

    assert_eq!(result.change(&id("src/a.ts")), Some(ChangeKind::Changed));
    assert_eq!(result.change(&id("src/b.ts")), Some(ChangeKind::Changed));
    assert_eq!(
        engine.graph().state(&id("src/b.ts")),
        Some(ModuleState::Resolved)
    );
}

#[tokio::test]
async fn dropped_imports_are_pruned() {
    let runtime = abc_project();
    let mut engine = engine(&runtime, CompatRegistry::node());
    engine.build(&["src/a.ts"]).await.unwrap();
    assert!(engine.graph().contains(&id("src/b.ts")));

    runtime.add_file(abs("src/a.ts"), "export const a = () => 0;\n");
    let result = engine.rebuild(&[abs("src/a.ts")]).await.unwrap();

    assert_eq!(result.change(&id("src/a.ts")), Some(ChangeKind::Changed));
    assert_eq!(result.change(&id("src/b.ts")), Some(ChangeKind::Removed));
    assert!(!engine.graph().contains(&id("src/b.ts")));
}

#[tokio::test]
async fn created_file_satisfies_a_missing_import() {
    let runtime = project(&[(
        "src/a.ts",
        "import { later } from \"./later\";\nexport const a = later;\n",
    )]);
    let mut engine = engine(&runtime, CompatRegistry::node());
    let first = engine.build(&["src/a.ts"]).await.unwrap();
    assert_eq!(first.errors.len(), 1);
    assert_eq!(first.errors[0].kind, ModuleErrorKind::NotFound);

    runtime.add_file(abs("src/later.ts"), "export const later = 1;\n");
    let result = engine.rebuild(&[abs("src/later.ts")]).await.unwrap();

    assert!(!result.has_errors(), "{:?}", result.errors);
    assert_eq!(result.change(&id("src/later.ts")), Some(ChangeKind::Added));
    assert_eq!(result.change(&id("src/a.ts")), Some(ChangeKind::Changed));
    assert_eq!(
        engine.graph().edges(&id("src/a.ts"))[0].target,
        EdgeTarget::Module(id("src/later.ts"))
    );
}

#[tokio::test]
async fn created_entry_file_replaces_the_missing_one() {
    let runtime = project(&[]);
    let mut engine = engine(&runtime, CompatRegistry::node());
    let first = engine.build(&["src/main"]).await.unwrap();
    assert_eq!(first.errors.len(), 1);

    runtime.add_file(abs("src/main.ts"), "export const main = 1;\n");
    let result = engine.rebuild(&[abs("src/main.ts")]).await.unwrap();

    assert!(!result.has_errors(), "{:?}", result.errors);
    assert_eq!(result.change(&id("src/main.ts")), Some(ChangeKind::Added));
    assert_eq!(result.change(&id("src/main")), Some(ChangeKind::Removed));
    assert_eq!(engine.graph().entry_points(), vec![id("src/main.ts")]);
}

/// Script transformer that cancels a token during its first transform.
#[derive(Debug)]
struct CancelOnce {
    token: CancelToken,
    fired: AtomicBool,
    inner: ScriptTransformer,
}

#[async_trait]
impl Transformer for CancelOnce {
    fn name(&self) -> &'static str {
        "cancel-once"
    }

    fn fingerprint(&self) -> ConfigHash {
        self.inner.fingerprint()
    }

    fn supports(&self, dialect: Dialect) -> bool {
        self.inner.supports(dialect)
    }

    async fn transform(&self, request: &TransformRequest) -> Result<Artifact, TransformError> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.token.cancel();
        }
        self.inner.transform(request).await
    }
}

#[tokio::test]
async fn cancelled_build_leaves_work_for_the_next_call() {
    let runtime = abc_project();
    let engine = BuildEngine::new(
        options(1),
        Arc::new(CompatRegistry::node()),
        runtime.clone(),
    );
    let token = engine.cancel_token();
    let mut engine = engine.with_transformers(TransformerSet::new().with(Arc::new(CancelOnce {
        token: token.clone(),
        fired: AtomicBool::new(false),
        inner: ScriptTransformer::default(),
    })));

    let cancelled = engine.build(&["src/a.ts"]).await.unwrap();
    assert_eq!(cancelled.status, BuildStatus::Cancelled);
    assert_eq!(cancelled.stats.visited, 1);
    assert!(!token.is_cancelled());
    let graph = engine.graph();
    assert_eq!(graph.state(&id("src/a.ts")), Some(ModuleState::Stale));
    assert_eq!(graph.state(&id("src/b.ts")), Some(ModuleState::Stale));

    let no_changes: [&str; 0] = [];
    let resumed = engine.rebuild(&no_changes).await.unwrap();
    assert!(resumed.is_complete());
    assert_eq!(graph.state(&id("src/a.ts")), Some(ModuleState::Resolved));
    assert_eq!(graph.state(&id("src/b.ts")), Some(ModuleState::Resolved));
    assert!(graph.stale_modules().is_empty());
}

/// Counts transforms and sleeps, so concurrent callers overlap.
#[derive(Debug, Default)]
struct SlowTransformer {
    calls: AtomicUsize,
    inner: ScriptTransformer,
}

#[async_trait]
impl Transformer for SlowTransformer {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn fingerprint(&self) -> ConfigHash {
        self.inner.fingerprint()
    }

    fn supports(&self, dialect: Dialect) -> bool {
        self.inner.supports(dialect)
    }

    async fn transform(&self, request: &TransformRequest) -> Result<Artifact, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.transform(request).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identical_files_are_transformed_once() {
    let body = "export const same = 1;\n";
    let runtime = project(&[
        (
            "src/a.ts",
            "import { same as x } from \"./x\";\nimport { same as y } from \"./y\";\nimport { same as z } from \"./z\";\nexport const a = [x, y, z];\n",
        ),
        ("src/x.ts", body),
        ("src/y.ts", body),
        ("src/z.ts", body),
    ]);
    let slow = Arc::new(SlowTransformer::default());
    let mut engine = BuildEngine::new(options(8), Arc::new(CompatRegistry::node()), runtime.clone())
        .with_transformers(TransformerSet::new().with(slow.clone()));

    let result = engine.build(&["src/a.ts"]).await.unwrap();

    assert!(!result.has_errors());
    assert_eq!(result.stats.modules, 4);
    // a.ts plus one shared computation for the three identical files
    assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reconfigure_revalidates_everything() {
    let runtime = project(&[(
        "src/a.ts",
        "import fs from \"node:fs\";\nexport const a = fs.existsSync;\n",
    )]);
    let mut engine = engine(&runtime, CompatRegistry::node());
    let first = engine.build(&["src/a.ts"]).await.unwrap();
    assert!(!first.has_errors());

    engine.reconfigure(Arc::new(CompatRegistry::browser()));
    assert_eq!(engine.state(), &EngineState::Idle);
    assert!(engine.cache().is_empty());
    assert!(matches!(
        engine.rebuild(&[abs("src/a.ts")]).await,
        Err(Error::NotBuilt)
    ));

    let result = engine.build(&["src/a.ts"]).await.unwrap();
    assert_eq!(result.change(&id("src/a.ts")), Some(ChangeKind::Changed));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ModuleErrorKind::UnsupportedBuiltin);
    assert_eq!(result.stats.cache.misses, 1);
}

#[tokio::test]
async fn failed_registry_load_blocks_builds_until_reconfigured() {
    let runtime = abc_project();
    let mut engine = engine(&runtime, CompatRegistry::node());
    engine.build(&["src/c.ts"]).await.unwrap();

    let mut compat = CompatOptions::default();
    compat.modules.insert(
        "left-pad".to_string(),
        CompatRule::Mode(CompatMode::Disallowed),
    );
    let err = engine
        .reconfigure_from_options(&compat, &abs(""))
        .unwrap_err();
    assert!(matches!(err, Error::Compat(CompatError::UnknownBuiltin(ref name)) if name == "left-pad"));
    assert!(matches!(engine.state(), EngineState::Failed { .. }));
    assert!(matches!(
        engine.build(&["src/c.ts"]).await,
        Err(Error::Failed { .. })
    ));

    engine.reconfigure(Arc::new(CompatRegistry::node()));
    let result = engine.build(&["src/c.ts"]).await.unwrap();
    assert!(result.is_complete());
}
