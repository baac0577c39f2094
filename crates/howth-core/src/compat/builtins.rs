//! The Node.js built-in module table.

use phf::phf_set;

pub const NODE_PREFIX: &str = "node:";

/// Built-ins importable with or without the `node:` prefix.
pub static NODE_BUILTINS: phf::Set<&'static str> = phf_set! {
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "inspector/promises",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
};

/// Built-ins that only exist under the `node:` scheme.
pub static PREFIX_ONLY_BUILTINS: phf::Set<&'static str> = phf_set! {
    "sea",
    "sqlite",
    "test",
    "test/reporters",
};

/// Split a specifier into its canonical built-in name and whether it carried
/// the `node:` prefix. Returns `None` for anything that is not a built-in.
///
/// ```
/// use howth_core::compat::canonical_builtin;
///
/// assert_eq!(canonical_builtin("node:fs"), Some(("fs", true)));
/// assert_eq!(canonical_builtin("fs/promises"), Some(("fs/promises", false)));
/// assert_eq!(canonical_builtin("test"), None);
/// assert_eq!(canonical_builtin("node:test"), Some(("test", true)));
/// assert_eq!(canonical_builtin("lodash"), None);
/// ```
pub fn canonical_builtin(specifier: &str) -> Option<(&str, bool)> {
    match specifier.strip_prefix(NODE_PREFIX) {
        Some(name) if NODE_BUILTINS.contains(name) || PREFIX_ONLY_BUILTINS.contains(name) => {
            Some((name, true))
        }
        Some(_) => None,
        None if NODE_BUILTINS.contains(specifier) => Some((specifier, false)),
        None => None,
    }
}

/// Canonical name for a configured override key (`fs` or `node:fs`).
pub(crate) fn canonical_override_name(name: &str) -> Option<&'static str> {
    let stripped = name.strip_prefix(NODE_PREFIX).unwrap_or(name);
    NODE_BUILTINS
        .get_key(stripped)
        .or_else(|| PREFIX_ONLY_BUILTINS.get_key(stripped))
        .copied()
}

/// Every canonical built-in name, sorted.
pub fn all_builtins() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = NODE_BUILTINS
        .iter()
        .chain(PREFIX_ONLY_BUILTINS.iter())
        .copied()
        .collect();
    names.sort_unstable();
    names
}

pub fn is_prefix_only(name: &str) -> bool {
    PREFIX_ONLY_BUILTINS.contains(name)
}
