//! Engines built from `howth.toml` against the real filesystem.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use howth_config::{HowthConfig, LoadOptions};
use howth_core::{BuildEngine, EdgeTarget, ModuleId, ModuleKind, NativeRuntime};
use tempfile::TempDir;

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture() -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    write(
        &root,
        "howth.toml",
        r#"
[build]
entries = ["src/index.ts"]
parallelism = 2

[cache]
dir = ".howth/cache"

[compat]
preset = "browser"

[compat.modules]
fs = { shim = "shim/fs.ts" }
"#,
    );
    write(
        &root,
        "src/index.ts",
        "import { readFileSync } from \"node:fs\";\nimport { util } from \"./util\";\nexport const run = () => readFileSync(util);\n",
    );
    write(&root, "src/util.ts", "export const util = \"a.txt\";\n");
    write(
        &root,
        "shim/fs.ts",
        "export const readFileSync = (path: string) => path;\n",
    );
    (temp, root)
}

fn load(root: &Path) -> HowthConfig {
    HowthConfig::load(
        root,
        &LoadOptions {
            ignore_env: true,
            ..LoadOptions::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn config_drives_registry_and_entries() {
    let (_temp, root) = fixture();
    let config = load(&root);
    let mut engine = BuildEngine::from_config(&config, Arc::new(NativeRuntime::new())).unwrap();

    let result = engine.build_configured().await.unwrap();

    assert!(!result.has_errors(), "{:?}", result.errors);
    let graph = engine.graph();
    assert_eq!(graph.len(), 3);

    let index = ModuleId::new(root.join("src/index.ts")).unwrap();
    let shim = ModuleId::new(root.join("shim/fs.ts")).unwrap();
    assert_eq!(graph.edges(&index)[0].target, EdgeTarget::Module(shim.clone()));
    assert_eq!(
        graph.module(&shim).unwrap().kind,
        ModuleKind::Shim {
            builtin: "fs".to_string()
        }
    );
    assert_eq!(
        engine.cache().store_path(),
        Some(root.join(".howth/cache/transforms.redb").as_path())
    );
}

#[tokio::test]
async fn persisted_artifacts_serve_a_fresh_engine() {
    let (_temp, root) = fixture();
    let config = load(&root);

    {
        let mut engine =
            BuildEngine::from_config(&config, Arc::new(NativeRuntime::new())).unwrap();
        let result = engine.build_configured().await.unwrap();
        assert_eq!(result.stats.cache.misses, 3);
    }

    let mut engine = BuildEngine::from_config(&config, Arc::new(NativeRuntime::new())).unwrap();
    let result = engine.build_configured().await.unwrap();

    assert!(!result.has_errors());
    assert_eq!(result.stats.cache.store_hits, 3);
    assert_eq!(result.stats.cache.misses, 0);
}

#[tokio::test]
async fn file_edits_on_disk_are_picked_up() {
    let (_temp, root) = fixture();
    let config = load(&root);
    let mut engine = BuildEngine::from_config(&config, Arc::new(NativeRuntime::new())).unwrap();
    engine.build_configured().await.unwrap();

    write(&root, "src/util.ts", "export const util = \"b.txt\";\n");
    let result = engine.rebuild(&[root.join("src/util.ts")]).await.unwrap();

    let util = ModuleId::new(root.join("src/util.ts")).unwrap();
    let index = ModuleId::new(root.join("src/index.ts")).unwrap();
    assert_eq!(result.changes.len(), 2);
    assert!(result.changes.contains_key(&util));
    assert!(result.changes.contains_key(&index));
    let module = engine.graph().module(&util).unwrap();
    let artifact = module.artifact.as_ref().unwrap();
    assert!(artifact.code.contains("b.txt"));
}
