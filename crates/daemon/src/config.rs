// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: state-dir defaults plus an optional config file.

use crate::lifecycle::LifecycleError;
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_IMAGE: &str = "ghcr.io/groundwork/runner:latest";

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/groundwork)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to store snapshot file
    pub snapshot_path: PathBuf,
    /// Directory state backups are written to; None disables backups
    pub backup_dir: Option<PathBuf>,
    /// Container image run in workspace and runner pods
    pub image: String,
    /// Reconcile workers per dispatcher
    pub workers: usize,
}

/// Optional overrides read from `config.toml` in the state directory.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    image: Option<String>,
    backup_dir: Option<PathBuf>,
    workers: Option<usize>,
}

impl Config {
    /// Load configuration. Paths are fixed under the state directory
    /// (`$GW_STATE_DIR`, `$XDG_STATE_HOME/groundwork`, or
    /// `~/.local/state/groundwork`); a `config.toml` there may override the
    /// tunables.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let file = read_file_config(&state_dir.join("config.toml"))?;

        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("snapshot.json"),
            backup_dir: file.backup_dir,
            image: file.image.unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            workers: file.workers.unwrap_or(4),
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("GW_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(dir).join("groundwork"));
    }
    match std::env::var("HOME") {
        Ok(home) => Ok(PathBuf::from(home).join(".local/state/groundwork")),
        Err(_) => Err(LifecycleError::NoStateDir),
    }
}

fn read_file_config(path: &std::path::Path) -> Result<FileConfig, LifecycleError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&raw).map_err(|e| LifecycleError::BadConfig(e.to_string()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
