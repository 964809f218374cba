//! Unit tests for bootstrap configuration and graceful degradation
//!
//! Tests that manipulate DREAMLY_ROOT_FOLDER are marked with #[serial]
//! so they do not race on the process environment.

use dreamly_common::config::{
    default_config_path, default_root_folder, load_toml_or_default, LoggingConfig,
    RootFolderInitializer, RootFolderResolver, DATABASE_FILE_NAME, ROOT_FOLDER_ENV,
};
use dreamly_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct SampleConfig {
    root_folder: Option<PathBuf>,
    port: u16,
    logging: Option<SampleLogging>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleLogging {
    level: String,
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, default_root_folder());
    assert!(root_folder.to_string_lossy().contains("dreamly"));
}

#[test]
#[serial]
fn test_resolver_cli_wins_over_env_and_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/dreamly-env");

    let root_folder = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/dreamly-cli")))
        .with_toml_root(Some(PathBuf::from("/tmp/dreamly-toml")))
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root_folder, PathBuf::from("/tmp/dreamly-cli"));
}

#[test]
#[serial]
fn test_resolver_env_wins_over_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/dreamly-env");

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/tmp/dreamly-toml")))
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root_folder, PathBuf::from("/tmp/dreamly-env"));
}

#[test]
#[serial]
fn test_resolver_blank_env_falls_through_to_toml() {
    env::set_var(ROOT_FOLDER_ENV, "   ");

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/tmp/dreamly-toml")))
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root_folder, PathBuf::from("/tmp/dreamly-toml"));
}

#[test]
fn test_missing_toml_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let config: SampleConfig = load_toml_or_default(&path).unwrap();

    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_present_toml_is_parsed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dreamly-roots.toml");
    std::fs::write(
        &path,
        "root_folder = \"/srv/dreamly\"\nport = 6001\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let config: SampleConfig = load_toml_or_default(&path).unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/dreamly")));
    assert_eq!(config.port, 6001);
    assert_eq!(config.logging.unwrap().level, "debug");
}

#[test]
fn test_broken_toml_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "port = = 1").unwrap();

    let result: dreamly_common::Result<SampleConfig> = load_toml_or_default(&path);

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_initializer_creates_root_folder() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("nested").join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    // Second call is a no-op
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE_NAME));
    assert_eq!(initializer.root_folder(), root.as_path());
}

#[test]
fn test_default_config_path_names_module() {
    let path = default_config_path("dreamly-roots");
    assert!(path.ends_with("dreamly/dreamly-roots.toml"));
}

#[test]
fn test_logging_config_default_level() {
    assert_eq!(LoggingConfig::default().level, "info");
}
