//! Configuration and root folder resolution tests
//!
//! Tests that touch `TRACKR_*` environment variables are marked `#[serial]`
//! so they never run in parallel with each other.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trackr_common::config::{
    default_root_folder, resolve_root_folder, KioskConfig, Secrets, ADMIN_ACCESS_ID_ENV,
    ADMIN_PASSWORD_ENV, CONFIG_FILE_NAME, ROOT_FOLDER_ENV, SESSION_SECRET_ENV,
};
use trackr_common::Error;

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/trackr-from-env");
    let resolved = resolve_root_folder(Some(Path::new("/tmp/trackr-from-cli")), ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/tmp/trackr-from-cli"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/trackr-from-env");
    let resolved = resolve_root_folder(None, ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/tmp/trackr-from-env"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_blank_env_var_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");
    let resolved = resolve_root_folder(None, ROOT_FOLDER_ENV);
    assert_ne!(resolved, PathBuf::from("   "));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_default_root_folder_not_empty() {
    assert!(!default_root_folder().as_os_str().is_empty());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = KioskConfig::load(dir.path()).unwrap();
    assert_eq!(config.port, 5000);
    assert_eq!(config.capacity, 30);
}

#[test]
fn test_config_file_loaded_from_root() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "capacity = 12\nroster_file = \"roster.csv\"\n",
    )
    .unwrap();
    let config = KioskConfig::load(dir.path()).unwrap();
    assert_eq!(config.capacity, 12);
    assert_eq!(config.roster_path(dir.path()), dir.path().join("roster.csv"));
}

#[test]
fn test_malformed_config_file_is_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "capacity = \"lots\"").unwrap();
    assert!(matches!(KioskConfig::load(dir.path()), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_secrets_require_admin_password() {
    env::remove_var(ADMIN_PASSWORD_ENV);
    assert!(matches!(Secrets::from_env(), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_secrets_from_env() {
    env::set_var(ADMIN_PASSWORD_ENV, "pw");
    env::set_var(ADMIN_ACCESS_ID_ENV, "");
    env::set_var(SESSION_SECRET_ENV, "signing-key");

    let secrets = Secrets::from_env().unwrap();
    assert_eq!(secrets.admin_password, "pw");
    assert!(secrets.admin_access_id.is_none());
    assert_eq!(secrets.session_secret.as_deref(), Some("signing-key"));

    env::remove_var(ADMIN_PASSWORD_ENV);
    env::remove_var(ADMIN_ACCESS_ID_ENV);
    env::remove_var(SESSION_SECRET_ENV);
}
