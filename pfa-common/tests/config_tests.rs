//! Tests for bootstrap configuration and root folder resolution
//!
//! Tests that manipulate PFA_* environment variables are marked #[serial]
//! so they never run in parallel with each other.

use pfa_common::config::{
    config_file_path, resolve_root_folder, RootFolder, TomlConfig, ENV_AI_API_KEY, ENV_CONFIG,
    ENV_ROOT_FOLDER, ENV_SMTP_PASSWORD,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults_when_toml_empty() {
    let config = TomlConfig::from_toml_str("").unwrap();

    assert_eq!(config.port, 5780);
    assert_eq!(config.bind, "127.0.0.1");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.ai.model, "gemini-1.5-flash");
    assert!(!config.ai.is_configured());
    assert!(!config.smtp.is_configured());
    assert_eq!(config.smtp.port, 587);
    assert!(config.smtp.use_tls);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 8080

        [ai]
        api_key = "secret"

        [smtp]
        host = "smtp.example.com"
        from = "Me <me@example.com>"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 8080);
    assert!(config.ai.is_configured());
    assert_eq!(config.ai.timeout_secs, 60);
    assert!(config.smtp.is_configured());
    assert_eq!(config.smtp.port, 587);
}

#[test]
fn test_whitespace_api_key_is_not_configured() {
    let config = TomlConfig::from_toml_str("[ai]\napi_key = \"   \"\n").unwrap();
    assert!(!config.ai.is_configured());
}

#[test]
fn test_malformed_toml_is_an_error() {
    assert!(TomlConfig::from_toml_str("port = \"not a number\"").is_err());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = TomlConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.port, 5780);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pfa.toml");
    std::fs::write(&path, "root_folder = \"/srv/pfa\"\nmax_upload_bytes = 1024\n").unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/pfa")));
    assert_eq!(config.max_upload_bytes, 1024);
}

#[test]
#[serial]
fn test_env_overrides_secrets() {
    env::set_var(ENV_AI_API_KEY, "from-env");
    env::set_var(ENV_SMTP_PASSWORD, "hunter2");

    let config = TomlConfig::default().apply_env_overrides();

    env::remove_var(ENV_AI_API_KEY);
    env::remove_var(ENV_SMTP_PASSWORD);

    assert_eq!(config.ai.api_key.as_deref(), Some("from-env"));
    assert_eq!(config.smtp.password, "hunter2");
}

#[test]
#[serial]
fn test_cli_arg_beats_env_and_toml() {
    env::set_var(ENV_ROOT_FOLDER, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &toml);
    env::remove_var(ENV_ROOT_FOLDER);

    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ENV_ROOT_FOLDER, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let resolved = resolve_root_folder(None, &toml);
    env::remove_var(ENV_ROOT_FOLDER);

    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_toml_beats_default() {
    env::remove_var(ENV_ROOT_FOLDER);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_default_root_folder_is_named_pfa() {
    env::remove_var(ENV_ROOT_FOLDER);
    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert!(resolved.to_string_lossy().contains("pfa"));
}

#[test]
#[serial]
fn test_config_file_path_priority() {
    env::set_var(ENV_CONFIG, "/etc/pfa/custom.toml");
    assert_eq!(
        config_file_path(Some(Path::new("/tmp/cli.toml"))),
        PathBuf::from("/tmp/cli.toml")
    );
    assert_eq!(config_file_path(None), PathBuf::from("/etc/pfa/custom.toml"));
    env::remove_var(ENV_CONFIG);
}

#[test]
fn test_root_folder_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().join("nested").join("pfa"));

    root.ensure_directories().unwrap();

    assert!(root.path().is_dir());
    assert!(root.uploads_dir().is_dir());
    assert_eq!(root.database_path().file_name().unwrap(), "pfa.db");
}
