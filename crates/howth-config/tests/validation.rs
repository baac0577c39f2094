//! Schema and filesystem validation.

use std::fs;
use std::path::PathBuf;

use howth_config::{
    CompatRule, ConfigError, HowthConfig, validate_fs, validate_schema,
};
use tempfile::TempDir;

fn with_entry() -> HowthConfig {
    let mut config = HowthConfig::default();
    config.build.entries = vec![PathBuf::from("src/index.ts")];
    config
}

#[test]
fn requires_entries() {
    let err = validate_schema(&HowthConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigError::NoEntries));
    assert!(err.hint().is_some());
}

#[test]
fn rejects_dotted_extensions() {
    let mut config = with_entry();
    config.build.extensions = vec![".ts".into()];
    assert!(matches!(
        validate_schema(&config),
        Err(ConfigError::SchemaValidation { .. })
    ));
}

#[test]
fn priority_must_be_subset_of_extensions() {
    let mut config = with_entry();
    config.build.extensions = vec!["ts".into(), "js".into()];
    config.build.extension_priority = vec!["js".into(), "vue".into()];

    let err = validate_schema(&config).unwrap_err();
    assert!(err.to_string().contains("vue"));
}

#[test]
fn rejects_zero_parallelism_and_capacity() {
    let mut config = with_entry();
    config.build.parallelism = Some(0);
    assert!(validate_schema(&config).is_err());

    let mut config = with_entry();
    config.cache.max_entries = 0;
    assert!(validate_schema(&config).is_err());
}

#[test]
fn rejects_empty_shim_path() {
    let mut config = with_entry();
    config.compat.modules.insert(
        "fs".into(),
        CompatRule::Shim {
            shim: PathBuf::new(),
        },
    );
    assert!(validate_schema(&config).is_err());
}

#[test]
fn fs_validation_checks_entries_and_shims() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/index.ts"), "export {}").unwrap();

    let mut config = with_entry();
    config.build.root = dir.path().to_path_buf();
    validate_fs(&config).unwrap();

    config.compat.modules.insert(
        "fs".into(),
        CompatRule::Shim {
            shim: PathBuf::from("shim/fs.ts"),
        },
    );
    let err = validate_fs(&config).unwrap_err();
    assert!(matches!(err, ConfigError::ShimNotFound { ref builtin, .. } if builtin == "fs"));

    config.build.entries.push(PathBuf::from("src/missing.ts"));
    config.compat.modules.clear();
    assert!(matches!(
        validate_fs(&config),
        Err(ConfigError::EntryNotFound { .. })
    ));
}
