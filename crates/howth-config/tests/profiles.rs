//! Tests for configuration profiles and merging behavior.

use howth_config::{CompatMode, CompatRule, ConfigDiscovery};
use std::fs;
use tempfile::TempDir;

#[test]
fn profile_overrides_build_options() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("howth.toml"),
        r#"
[build]
entries = ["src/index.ts"]
fail_fast = false
conditions = ["import", "default"]

[profiles.production.build]
fail_fast = true
conditions = ["production", "import", "default"]
"#,
    )
    .expect("write config");

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("production")
        .expect("load with profile");

    assert!(config.build.fail_fast);
    assert_eq!(config.build.conditions, vec!["production", "import", "default"]);
}

#[test]
fn profile_adds_compat_overrides() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("howth.toml"),
        r#"
[build]
entries = ["src/index.ts"]

[compat.modules]
fs = { shim = "shim/fs.ts" }

[profiles.locked.compat.modules]
child_process = "disallowed"
"#,
    )
    .expect("write config");

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("locked")
        .expect("load with profile");

    assert_eq!(config.compat.modules.len(), 2);
    assert_eq!(
        config.compat.modules["child_process"],
        CompatRule::Mode(CompatMode::Disallowed)
    );
    assert!(matches!(config.compat.modules["fs"], CompatRule::Shim { .. }));
}

#[test]
fn base_config_is_untouched_without_profile() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("howth.toml"),
        r#"
[build]
entries = ["src/index.ts"]

[profiles.ci.build]
fail_fast = true
"#,
    )
    .expect("write config");

    let config = ConfigDiscovery::new(dir.path()).load().expect("load");
    assert!(!config.build.fail_fast);
    assert!(config.profiles.contains_key("ci"));
}
