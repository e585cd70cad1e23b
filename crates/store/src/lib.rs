// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gw-store: the declarative store the controllers reconcile against.
//!
//! The [`Store`] trait models an eventually-consistent get/list/watch/
//! create/update API over the closed [`AnyObject`] resource set. Status is
//! a distinct sub-resource from spec/metadata, updated independently, and
//! every write is fenced by the object's resource version (optimistic
//! concurrency). [`MemoryStore`] is the in-process implementation used by
//! the daemon and by tests.

mod error;
mod memory;
mod object;
mod snapshot;
mod watch;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use object::{AnyObject, ObjectVariant};
pub use snapshot::{Snapshot, SnapshotError};
pub use watch::{WatchAction, WatchEvent};

use async_trait::async_trait;
use gw_core::{ObjectKey, ResourceKind};
use tokio::sync::broadcast;

/// Declarative store: typed objects addressed by (kind, namespace, name).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Fetch one object.
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> Result<AnyObject, StoreError>;

    /// List all objects of a kind within a namespace.
    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<AnyObject>, StoreError>;

    /// Create an object. The stored copy (with its assigned resource
    /// version and creation timestamp) is returned.
    async fn create(&self, object: AnyObject) -> Result<AnyObject, StoreError>;

    /// Update an object's spec and metadata. The object's status is left as
    /// stored; writes carrying a stale resource version fail with
    /// [`StoreError::Conflict`].
    async fn update(&self, object: AnyObject) -> Result<AnyObject, StoreError>;

    /// Update an object's status sub-resource only. Spec and metadata are
    /// left as stored.
    async fn update_status(&self, object: AnyObject) -> Result<AnyObject, StoreError>;

    /// Request deletion. Objects carrying finalizers are marked with a
    /// deletion timestamp instead of being removed.
    async fn delete(&self, kind: ResourceKind, key: &ObjectKey) -> Result<(), StoreError>;

    /// Subscribe to change notifications for all kinds.
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent>;
}

/// Typed convenience wrappers over the [`Store`] object API.
#[async_trait]
pub trait StoreExt: Store {
    async fn get_as<T: ObjectVariant>(&self, key: &ObjectKey) -> Result<T, StoreError> {
        T::from_any(self.get(T::KIND, key).await?)
    }

    async fn list_as<T: ObjectVariant>(&self, namespace: &str) -> Result<Vec<T>, StoreError> {
        self.list(T::KIND, namespace)
            .await?
            .into_iter()
            .map(T::from_any)
            .collect()
    }

    async fn create_as<T: ObjectVariant>(&self, object: T) -> Result<T, StoreError> {
        T::from_any(self.create(object.into_any()).await?)
    }

    async fn update_as<T: ObjectVariant>(&self, object: T) -> Result<T, StoreError> {
        T::from_any(self.update(object.into_any()).await?)
    }

    async fn update_status_as<T: ObjectVariant>(&self, object: T) -> Result<T, StoreError> {
        T::from_any(self.update_status(object.into_any()).await?)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
