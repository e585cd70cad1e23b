// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State backup providers.

mod local;

pub use local::LocalDirProvider;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProvider;

use async_trait::async_trait;
use gw_core::{ObjectKey, Secret};
use thiserror::Error;

/// Errors from backup providers. Always retried with backoff and recorded
/// as a warning event on the workspace, never silently discarded.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("backup failed: {0}")]
    Backup(String),
    #[error("restore failed: {0}")]
    Restore(String),
}

/// Stores and retrieves copies of state secrets. Both operations are
/// idempotent; `Restore` returning `Ok(None)` means no backup exists for
/// the key, which is not an error.
#[async_trait]
pub trait BackupProvider: Send + Sync + 'static {
    async fn backup(&self, secret: &Secret) -> Result<(), ProviderError>;

    async fn restore(&self, key: &ObjectKey) -> Result<Option<Secret>, ProviderError>;
}
