// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, checkpointing, shutdown.

use crate::config::Config;
use fs2::FileExt;
use gw_controller::{
    Dispatcher, DispatcherConfig, DispatcherHandle, LocalDirProvider, RunReconciler,
    WorkspaceReconciler,
};
use gw_core::SystemClock;
use gw_store::{AnyObject, MemoryStore, Snapshot, SnapshotError, Store};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine state directory (no $HOME)")]
    NoStateDir,
    #[error("unable to acquire daemon lock: {0}")]
    LockFailed(std::io::Error),
    #[error("invalid config file: {0}")]
    BadConfig(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A started daemon: the store plus one dispatcher per primary kind.
pub struct Daemon {
    pub store: MemoryStore<SystemClock>,
    workspaces: DispatcherHandle,
    runs: DispatcherHandle,
    snapshot_path: PathBuf,
    // Held for the daemon's lifetime; dropping releases the lock.
    _lock_file: File,
}

/// Load the snapshot, start the reconcilers, and seed a full first pass.
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let lock_file = acquire_lock(config)?;

    let store = MemoryStore::default();
    if let Some(snapshot) = Snapshot::load(&config.snapshot_path)? {
        info!(objects = snapshot.objects.len(), "restored store snapshot");
        snapshot.restore(&store);
    }

    let arc_store: Arc<dyn Store> = Arc::new(store.clone());

    let mut workspace_reconciler =
        WorkspaceReconciler::new(Arc::clone(&arc_store), SystemClock, config.image.clone());
    if let Some(backup_dir) = &config.backup_dir {
        workspace_reconciler = workspace_reconciler
            .with_backup_provider(Arc::new(LocalDirProvider::new(backup_dir.clone())));
    }
    let run_reconciler =
        RunReconciler::new(Arc::clone(&arc_store), SystemClock, config.image.clone());

    let dispatcher_config = DispatcherConfig {
        workers: config.workers,
        ..DispatcherConfig::default()
    };
    let workspaces = Dispatcher::start(
        Arc::new(workspace_reconciler),
        store.subscribe(),
        dispatcher_config,
    );
    let runs = Dispatcher::start(
        Arc::new(run_reconciler),
        store.subscribe(),
        dispatcher_config,
    );

    // Level-triggered: every known primary gets one pass at startup, so
    // state mutated while the daemon was down converges without waiting
    // for a new event.
    let mut workspace_keys = Vec::new();
    let mut run_keys = Vec::new();
    for object in store.contents() {
        match &object {
            AnyObject::Workspace(ws) => workspace_keys.push(ws.meta.key()),
            AnyObject::Run(run) => run_keys.push(run.meta.key()),
            _ => {}
        }
    }
    info!(
        workspaces = workspace_keys.len(),
        runs = run_keys.len(),
        "seeding initial reconcile pass"
    );
    workspaces.seed(workspace_keys);
    runs.seed(run_keys);

    Ok(Daemon {
        store,
        workspaces,
        runs,
        snapshot_path: config.snapshot_path.clone(),
        _lock_file: lock_file,
    })
}

impl Daemon {
    /// Drain in-flight reconciles, stop the dispatchers, and write a final
    /// snapshot.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        self.workspaces.shutdown().await;
        self.runs.shutdown().await;
        Snapshot::capture(&self.store).save(&self.snapshot_path)?;
        info!("final snapshot saved");
        Ok(())
    }
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;
    file.try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Checkpoint interval (60 seconds)
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a task that periodically saves store snapshots.
///
/// This bounds how much state a crash can lose.
pub fn spawn_checkpoint(
    store: MemoryStore<SystemClock>,
    snapshot_path: PathBuf,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            if let Err(e) = Snapshot::capture(&store).save(&snapshot_path) {
                warn!(error = %e, "failed to save checkpoint snapshot");
            }
        }
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
