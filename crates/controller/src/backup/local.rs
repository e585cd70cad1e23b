// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup provider writing state secrets to a local directory.

use super::{BackupProvider, ProviderError};
use async_trait::async_trait;
use gw_core::{Object, ObjectKey, Secret};
use std::path::{Path, PathBuf};

/// Stores each backed-up secret as one JSON file under a directory, named
/// by the secret's key so backup and restore agree without coordination.
pub struct LocalDirProvider {
    dir: PathBuf,
}

impl LocalDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &ObjectKey) -> PathBuf {
        self.dir.join(format!("{}-{}.json", key.namespace, key.name))
    }
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, std::io::Error> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl BackupProvider for LocalDirProvider {
    async fn backup(&self, secret: &Secret) -> Result<(), ProviderError> {
        let path = self.path_for(&secret.key());
        let data = serde_json::to_vec_pretty(secret)
            .map_err(|e| ProviderError::Backup(e.to_string()))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ProviderError::Backup(e.to_string()))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ProviderError::Backup(e.to_string()))?;
        Ok(())
    }

    async fn restore(&self, key: &ObjectKey) -> Result<Option<Secret>, ProviderError> {
        let path = self.path_for(key);
        let data = match read_if_exists(&path)
            .await
            .map_err(|e| ProviderError::Restore(e.to_string()))?
        {
            Some(data) => data,
            None => return Ok(None),
        };
        let secret: Secret =
            serde_json::from_slice(&data).map_err(|e| ProviderError::Restore(e.to_string()))?;
        Ok(Some(secret))
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
