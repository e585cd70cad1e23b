// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process store implementation.

use crate::error::StoreError;
use crate::object::AnyObject;
use crate::watch::{WatchAction, WatchEvent};
use crate::Store;
use async_trait::async_trait;
use gw_core::{Clock, ObjectKey, ResourceKind, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

const WATCH_CAPACITY: usize = 256;

struct Inner<C> {
    objects: Mutex<HashMap<(ResourceKind, ObjectKey), AnyObject>>,
    /// Monotonic source of resource versions across all kinds.
    version: AtomicU64,
    watch_tx: broadcast::Sender<WatchEvent>,
    clock: C,
}

/// In-process [`Store`]: a mutex-guarded object map with monotonically
/// increasing resource versions and broadcast watch notifications.
///
/// Writes are linearized by the map mutex; reads return clones, so a
/// caller's copy can always go stale, which is the environment the
/// optimistic-concurrency contract is written for.
pub struct MemoryStore<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for MemoryStore<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn new(clock: C) -> Self {
        let (watch_tx, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                objects: Mutex::new(HashMap::new()),
                version: AtomicU64::new(1),
                watch_tx,
                clock,
            }),
        }
    }

    /// All stored objects, for snapshotting.
    pub fn contents(&self) -> Vec<AnyObject> {
        let mut objects: Vec<AnyObject> =
            self.inner.objects.lock().values().cloned().collect();
        objects.sort_by(|a, b| (a.kind().as_str(), a.key().to_string())
            .cmp(&(b.kind().as_str(), b.key().to_string())));
        objects
    }

    /// Load objects (from a snapshot), advancing the version counter past
    /// every restored resource version.
    pub fn restore_objects(&self, objects: Vec<AnyObject>) {
        let mut map = self.inner.objects.lock();
        let mut max_version = 0;
        for object in objects {
            max_version = max_version.max(object.meta().resource_version);
            map.insert((object.kind(), object.key()), object);
        }
        let next = max_version + 1;
        self.inner.version.fetch_max(next, Ordering::SeqCst);
    }

    /// Remove an object outright, regardless of finalizers. Models the
    /// garbage collector completing a cascading delete once dependents are
    /// gone; tests use it to finish deletions the core never performs.
    pub fn finalize(&self, kind: ResourceKind, key: &ObjectKey) -> Result<(), StoreError> {
        let removed = self
            .inner
            .objects
            .lock()
            .remove(&(kind, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })?;
        self.broadcast(WatchAction::Deleted, removed);
        Ok(())
    }

    fn next_version(&self) -> u64 {
        self.inner.version.fetch_add(1, Ordering::SeqCst)
    }

    fn broadcast(&self, action: WatchAction, object: AnyObject) {
        // No receivers is fine; watches are an optimization, not a log.
        let _ = self.inner.watch_tx.send(WatchEvent::new(action, object));
    }
}

#[async_trait]
impl<C: Clock> Store for MemoryStore<C> {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> Result<AnyObject, StoreError> {
        self.inner
            .objects
            .lock()
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })
    }

    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<AnyObject>, StoreError> {
        let mut objects: Vec<AnyObject> = self
            .inner
            .objects
            .lock()
            .iter()
            .filter(|((k, key), _)| *k == kind && key.namespace == namespace)
            .map(|(_, object)| object.clone())
            .collect();
        objects.sort_by(|a, b| a.meta().name.cmp(&b.meta().name));
        Ok(objects)
    }

    async fn create(&self, mut object: AnyObject) -> Result<AnyObject, StoreError> {
        let kind = object.kind();
        let key = object.key();

        let meta = object.meta_mut();
        meta.resource_version = self.next_version();
        if meta.creation_epoch_ms == 0 {
            meta.creation_epoch_ms = self.inner.clock.epoch_ms();
        }
        meta.deletion_epoch_ms = None;

        {
            let mut map = self.inner.objects.lock();
            if map.contains_key(&(kind, key.clone())) {
                return Err(StoreError::AlreadyExists { kind, key });
            }
            map.insert((kind, key), object.clone());
        }

        self.broadcast(WatchAction::Added, object.clone());
        Ok(object)
    }

    async fn update(&self, mut object: AnyObject) -> Result<AnyObject, StoreError> {
        let kind = object.kind();
        let key = object.key();

        let updated = {
            let mut map = self.inner.objects.lock();
            let stored = map
                .get(&(kind, key.clone()))
                .ok_or_else(|| StoreError::NotFound {
                    kind,
                    key: key.clone(),
                })?;

            if object.meta().resource_version != stored.meta().resource_version {
                return Err(StoreError::Conflict { kind, key });
            }

            // Status is a separate sub-resource; spec/metadata writes never
            // touch it. Creation and deletion stamps stay store-managed.
            object.adopt_status(stored);
            let creation = stored.meta().creation_epoch_ms;
            let deletion = stored.meta().deletion_epoch_ms;
            let meta = object.meta_mut();
            meta.creation_epoch_ms = creation;
            meta.deletion_epoch_ms = deletion;

            // A write that changes nothing is a no-op: no version bump, no
            // watch event. Otherwise every level-triggered reconcile would
            // re-trigger itself through its own unchanged writes.
            if object == *stored {
                return Ok(object);
            }
            object.meta_mut().resource_version = self.next_version();

            map.insert((kind, key), object.clone());
            object
        };

        self.broadcast(WatchAction::Modified, updated.clone());
        Ok(updated)
    }

    async fn update_status(&self, object: AnyObject) -> Result<AnyObject, StoreError> {
        let kind = object.kind();
        let key = object.key();

        let updated = {
            let mut map = self.inner.objects.lock();
            let stored = map
                .get(&(kind, key.clone()))
                .ok_or_else(|| StoreError::NotFound {
                    kind,
                    key: key.clone(),
                })?;

            if object.meta().resource_version != stored.meta().resource_version {
                return Err(StoreError::Conflict { kind, key });
            }

            let mut next = stored.clone();
            next.adopt_status(&object);

            // Unchanged status: no-op, see update().
            if next == *stored {
                return Ok(next);
            }
            next.meta_mut().resource_version = self.next_version();

            map.insert((kind, key), next.clone());
            next
        };

        self.broadcast(WatchAction::Modified, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, kind: ResourceKind, key: &ObjectKey) -> Result<(), StoreError> {
        let (action, object) = {
            let mut map = self.inner.objects.lock();
            let stored = map
                .get_mut(&(kind, key.clone()))
                .ok_or_else(|| StoreError::NotFound {
                    kind,
                    key: key.clone(),
                })?;

            if stored.meta().finalizers.is_empty() {
                let removed = stored.clone();
                map.remove(&(kind, key.clone()));
                (WatchAction::Deleted, removed)
            } else if stored.meta().is_deleting() {
                // Deletion already requested; nothing more to record.
                return Ok(());
            } else {
                let epoch_ms = self.inner.clock.epoch_ms();
                let version = self.next_version();
                let meta = stored.meta_mut();
                meta.deletion_epoch_ms = Some(epoch_ms);
                meta.resource_version = version;
                (WatchAction::Modified, stored.clone())
            }
        };

        self.broadcast(action, object);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.watch_tx.subscribe()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
