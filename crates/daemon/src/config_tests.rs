// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn with_state_dir<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    std::env::set_var("GW_STATE_DIR", dir);
    let result = f();
    std::env::remove_var("GW_STATE_DIR");
    result
}

#[test]
#[serial]
fn defaults_without_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = with_state_dir(dir.path(), Config::load).unwrap();

    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.lock_path, dir.path().join("daemon.pid"));
    assert_eq!(config.snapshot_path, dir.path().join("snapshot.json"));
    assert_eq!(config.image, DEFAULT_IMAGE);
    assert_eq!(config.workers, 4);
    assert!(config.backup_dir.is_none());
}

#[test]
#[serial]
fn config_file_overrides_tunables() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
image = "registry.example.com/runner:2"
backup_dir = "/var/backups/groundwork"
workers = 8
"#,
    )
    .unwrap();

    let config = with_state_dir(dir.path(), Config::load).unwrap();
    assert_eq!(config.image, "registry.example.com/runner:2");
    assert_eq!(
        config.backup_dir.as_deref(),
        Some(std::path::Path::new("/var/backups/groundwork"))
    );
    assert_eq!(config.workers, 8);
}

#[test]
#[serial]
fn malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "workers = \"not a number\"").unwrap();
    let err = with_state_dir(dir.path(), Config::load).unwrap_err();
    assert!(matches!(err, LifecycleError::BadConfig(_)));
}
