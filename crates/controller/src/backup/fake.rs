// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backup provider for testing.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BackupProvider, ProviderError};
use async_trait::async_trait;
use gw_core::{Object, ObjectKey, Secret};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct FakeProviderState {
    backups: HashMap<ObjectKey, Secret>,
    backup_calls: Vec<ObjectKey>,
    restore_calls: Vec<ObjectKey>,
    fail_backup: Option<String>,
    fail_restore: Option<String>,
}

/// Fake backup provider recording calls, with injectable failures.
#[derive(Clone, Default)]
pub struct FakeProvider {
    inner: Arc<Mutex<FakeProviderState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing backup for a key.
    pub fn seed_backup(&self, secret: Secret) {
        self.inner.lock().backups.insert(secret.key(), secret);
    }

    /// Stored backup for a key, if any.
    pub fn backup_for(&self, key: &ObjectKey) -> Option<Secret> {
        self.inner.lock().backups.get(key).cloned()
    }

    /// Number of backup calls made so far.
    pub fn backup_count(&self) -> usize {
        self.inner.lock().backup_calls.len()
    }

    pub fn restore_count(&self) -> usize {
        self.inner.lock().restore_calls.len()
    }

    /// Make subsequent backup calls fail with the given message.
    pub fn fail_backup(&self, message: &str) {
        self.inner.lock().fail_backup = Some(message.to_string());
    }

    pub fn fail_restore(&self, message: &str) {
        self.inner.lock().fail_restore = Some(message.to_string());
    }
}

#[async_trait]
impl BackupProvider for FakeProvider {
    async fn backup(&self, secret: &Secret) -> Result<(), ProviderError> {
        let mut state = self.inner.lock();
        state.backup_calls.push(secret.key());
        if let Some(message) = &state.fail_backup {
            return Err(ProviderError::Backup(message.clone()));
        }
        state.backups.insert(secret.key(), secret.clone());
        Ok(())
    }

    async fn restore(&self, key: &ObjectKey) -> Result<Option<Secret>, ProviderError> {
        let mut state = self.inner.lock();
        state.restore_calls.push(key.clone());
        if let Some(message) = &state.fail_restore {
            return Err(ProviderError::Restore(message.clone()));
        }
        Ok(state.backups.get(key).cloned())
    }
}
