// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON snapshot persistence for the in-process store.

use crate::memory::MemoryStore;
use crate::object::AnyObject;
use gw_core::Clock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode/decode error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Point-in-time copy of the store's contents.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub objects: Vec<AnyObject>,
}

impl Snapshot {
    /// Capture the store's current contents.
    pub fn capture<C: Clock>(store: &MemoryStore<C>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            objects: store.contents(),
        }
    }

    /// Write the snapshot to `path`, atomically via a sibling temp file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a snapshot from `path`. A missing file is not an error; there
    /// is simply nothing to restore.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(Some(snapshot))
    }

    /// Load the snapshot's objects into the store.
    pub fn restore<C: Clock>(self, store: &MemoryStore<C>) {
        store.restore_objects(self.objects);
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
