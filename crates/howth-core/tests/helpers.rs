//! Shared fixtures for howth-core integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use howth_config::{BuildOptions, CompatPreset};
use howth_core::{BuildEngine, CompatRegistry, MemoryRuntime, ModuleId};

pub const ROOT: &str = "/proj";

/// In-memory project rooted at [`ROOT`] holding `files`.
pub fn project(files: &[(&str, &str)]) -> Arc<MemoryRuntime> {
    let runtime = MemoryRuntime::new(ROOT);
    for (path, content) in files {
        runtime.add_file(format!("{ROOT}/{path}"), content);
    }
    Arc::new(runtime)
}

pub fn options(parallelism: usize) -> BuildOptions {
    BuildOptions {
        root: PathBuf::from(ROOT),
        parallelism: Some(parallelism),
        ..BuildOptions::default()
    }
}

pub fn engine(runtime: &Arc<MemoryRuntime>, registry: CompatRegistry) -> BuildEngine {
    BuildEngine::new(options(4), Arc::new(registry), runtime.clone())
}

/// Browser preset with `fs` shimmed by `shim/fs.ts`.
pub fn browser_with_fs_shim() -> CompatRegistry {
    CompatRegistry::builder(CompatPreset::Browser)
        .shim_root(ROOT)
        .shim("fs", "shim/fs.ts")
        .build()
        .unwrap()
}

/// Module id for a project-relative path.
pub fn id(path: &str) -> ModuleId {
    ModuleId::new(format!("{ROOT}/{path}")).unwrap()
}

pub fn abs(path: &str) -> PathBuf {
    PathBuf::from(format!("{ROOT}/{path}"))
}
