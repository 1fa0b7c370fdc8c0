//! Project config discovery, parse-error and round-trip tests.

use assert_fs::prelude::*;
use forge_core::{ConfigError, ProjectConfig, Scope, Value, CONFIG_FILE_NAME, LEGACY_CONFIG_FILE_NAME};
use predicates::prelude::predicate;
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Discovery
// ---------------------------------------------------------------------------

#[test]
fn load_finds_config_in_ancestor_directory() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(CONFIG_FILE_NAME)
        .write_str(r#"{"project":{"name":"demo"},"tasks":{"app":{"port":8080}}}"#)
        .expect("write config");
    let nested = root.child("services").child("api");
    nested.create_dir_all().expect("mkdir");

    let mut config = ProjectConfig::new("app");
    assert!(config.load(nested.path()).expect("load"));

    assert_eq!(config.config_path(), Some(root.child(CONFIG_FILE_NAME).path()));
    assert_eq!(config.get("name", Scope::Project), Some(&Value::from("demo")));
    assert_eq!(config.get("port", Scope::Task), Some(&Value::Integer(8080)));
    assert!(!config.has_pending_changes());
}

#[test]
fn load_accepts_legacy_file_name_and_saves_it_in_place() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(LEGACY_CONFIG_FILE_NAME)
        .write_str(r#"{"project":{"name":"legacy"}}"#)
        .expect("write config");
    let nested = root.child("app");
    nested.create_dir_all().expect("mkdir");

    let mut config = ProjectConfig::new("app");
    assert!(config.load(nested.path()).expect("load"));
    assert_eq!(config.get("name", Scope::Project), Some(&Value::from("legacy")));

    config.set("port", Value::Integer(3000), Scope::Task);
    config.save(nested.path()).expect("save");
    root.child(LEGACY_CONFIG_FILE_NAME)
        .assert(predicate::str::contains("3000"));
    root.child(CONFIG_FILE_NAME).assert(predicate::path::missing());
}

#[test]
fn current_file_name_wins_within_one_directory() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(CONFIG_FILE_NAME)
        .write_str(r#"{"project":{"name":"current"}}"#)
        .expect("write config");
    root.child(LEGACY_CONFIG_FILE_NAME)
        .write_str(r#"{"project":{"name":"legacy"}}"#)
        .expect("write legacy");

    let mut config = ProjectConfig::new("app");
    assert!(config.load(root.path()).expect("load"));
    assert_eq!(config.config_path(), Some(root.child(CONFIG_FILE_NAME).path()));
}

#[test]
fn load_returns_false_when_start_dir_is_missing() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let mut config = ProjectConfig::new("app");
    assert!(!config.load(&root.path().join("nope")).expect("load"));
    assert!(config.config_path().is_none());
}

#[test]
fn load_corrupt_json_returns_parse_error_with_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(CONFIG_FILE_NAME).write_str("{ not json").expect("write");

    let mut config = ProjectConfig::new("app");
    let err = config.load(root.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}

// ---------------------------------------------------------------------------
// 2. Save
// ---------------------------------------------------------------------------

#[test]
fn save_after_load_writes_back_to_discovered_file() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child(CONFIG_FILE_NAME).write_str("{}").expect("write");
    let nested = root.child("sub");
    nested.create_dir_all().expect("mkdir");

    let mut config = ProjectConfig::new("app");
    config.load(nested.path()).expect("load");
    config.set("flavour", "mild", Scope::Task);
    config.save(nested.path()).expect("save");

    root.child(CONFIG_FILE_NAME)
        .assert(predicate::str::contains("\"flavour\": \"mild\""));
    nested.child(CONFIG_FILE_NAME).assert(predicate::path::missing());
}

#[rstest]
#[case(Scope::Task)]
#[case(Scope::Project)]
fn saved_values_reload_in_same_scope(#[case] scope: Scope) {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let mut config = ProjectConfig::new("app");
    config.set("enabled", true, scope);
    config.save(root.path()).expect("save");

    let mut reloaded = ProjectConfig::new("app");
    assert!(reloaded.load(root.path()).expect("load"));
    assert_eq!(reloaded.get("enabled", scope), Some(&Value::Bool(true)));
}
