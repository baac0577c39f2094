//! Change classification between two graph states.

use std::collections::BTreeMap;

use howth_graph::{EdgeTarget, Module, ModuleGraph, ModuleId};
use rustc_hash::FxHashMap;

use super::result::ChangeKind;

pub(crate) type Fingerprints = FxHashMap<ModuleId, blake3::Hash>;

/// Digest of what a module contributes to its consumers: content, config,
/// where its edges lead and which errors it carries.
fn fingerprint(module: &Module) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(
        module
            .content_hash
            .as_ref()
            .map_or(&[0u8; 32], |hash| hash.as_bytes()),
    );
    hasher.update(
        module
            .config_hash
            .as_ref()
            .map_or(&[0u8; 32], |hash| hash.as_bytes()),
    );
    for edge in &module.edges {
        hasher.update(edge.specifier.as_bytes());
        hasher.update(b"\0");
        match &edge.target {
            EdgeTarget::Module(id) => {
                hasher.update(b"m:");
                hasher.update(id.path_string().as_bytes());
            }
            EdgeTarget::Builtin(name) => {
                hasher.update(b"b:");
                hasher.update(name.as_bytes());
            }
            EdgeTarget::Unresolved => {
                hasher.update(b"u:");
            }
        }
        hasher.update(b"\0");
    }
    for diagnostic in &module.diagnostics {
        hasher.update(diagnostic.kind.as_str().as_bytes());
        hasher.update(b"\0");
    }
    hasher.finalize()
}

pub(crate) fn fingerprints(graph: &ModuleGraph) -> Fingerprints {
    graph
        .modules()
        .iter()
        .map(|module| (module.id.clone(), fingerprint(module)))
        .collect()
}

/// Added and Removed by presence; Changed for differing fingerprints plus
/// every module that transitively imports one.
pub(crate) fn classify(
    before: &Fingerprints,
    after: &Fingerprints,
    graph: &ModuleGraph,
) -> BTreeMap<ModuleId, ChangeKind> {
    let mut changes = BTreeMap::new();
    let mut direct = Vec::new();

    for (id, hash) in after {
        match before.get(id) {
            None => {
                changes.insert(id.clone(), ChangeKind::Added);
            }
            Some(previous) if previous != hash => direct.push(id.clone()),
            Some(_) => {}
        }
    }
    for id in before.keys() {
        if !after.contains_key(id) {
            changes.insert(id.clone(), ChangeKind::Removed);
        }
    }

    let importers = graph.transitive_importers(&direct);
    for id in direct.into_iter().chain(importers) {
        changes.entry(id).or_insert(ChangeKind::Changed);
    }

    changes
}
