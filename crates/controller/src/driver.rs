// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch-triggered reconcile dispatcher.
//!
//! One dispatcher per primary resource kind. It maintains a deduplicating
//! pending-keys queue: distinct keys reconcile in parallel across a bounded
//! worker pool, but a key is never reconciled twice concurrently: events
//! arriving while a key is in flight coalesce into at most one follow-up
//! pass (level-triggered; only the latest state matters). Failed keys are
//! retried with per-key exponential backoff; success clears the backoff.

use crate::error::ReconcileError;
use async_trait::async_trait;
use gw_core::ObjectKey;
use gw_store::WatchEvent;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A reconciler drives one resource kind toward desired state.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Map a watch event to the keys that must be reconciled in response.
    /// Must be pure: no store access, no side effects.
    fn map_event(&self, event: &WatchEvent) -> Vec<ObjectKey>;

    /// Drive the resource at `key` toward desired state. Must be
    /// idempotent; it will be called repeatedly for the same key.
    async fn reconcile(&self, key: &ObjectKey) -> Result<(), ReconcileError>;
}

/// Dispatcher tuning.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Number of concurrent reconcile workers.
    pub workers: usize,
    /// First retry delay after a failed reconcile.
    pub base_backoff: Duration,
    /// Upper bound on the retry delay.
    pub max_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(300),
        }
    }
}

#[derive(Default)]
struct QueueInner {
    pending: VecDeque<ObjectKey>,
    pending_set: HashSet<ObjectKey>,
    in_flight: HashSet<ObjectKey>,
    /// Keys whose events arrived while they were in flight; re-queued once
    /// the in-flight pass finishes.
    dirty: HashSet<ObjectKey>,
    /// Consecutive failure counts, for backoff.
    failures: HashMap<ObjectKey, u32>,
}

struct WorkQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    shutdown: watch::Sender<bool>,
}

impl WorkQueue {
    fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Mutex::new(QueueInner::default()),
            notify: Notify::new(),
            shutdown,
        }
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Schedule a key. Duplicate pending keys collapse; a key currently in
    /// flight is marked dirty and re-queued when its pass finishes.
    fn add(&self, key: ObjectKey) {
        if self.is_shutdown() {
            return;
        }
        {
            let mut inner = self.inner.lock();
            if inner.pending_set.contains(&key) {
                return;
            }
            if inner.in_flight.contains(&key) {
                inner.dirty.insert(key);
                return;
            }
            inner.pending_set.insert(key.clone());
            inner.pending.push_back(key);
        }
        self.notify.notify_one();
    }

    fn try_take(&self) -> Option<ObjectKey> {
        let mut inner = self.inner.lock();
        let key = inner.pending.pop_front()?;
        inner.pending_set.remove(&key);
        inner.in_flight.insert(key.clone());
        if !inner.pending.is_empty() {
            // Wake another worker for the remaining items.
            self.notify.notify_one();
        }
        Some(key)
    }

    /// Next key to reconcile, or `None` once shut down.
    async fn take(&self) -> Option<ObjectKey> {
        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            if *shutdown_rx.borrow() {
                return None;
            }
            if let Some(key) = self.try_take() {
                return Some(key);
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = shutdown_rx.changed() => {}
            }
        }
    }

    /// Mark a key's pass finished, re-queueing it if events arrived
    /// meanwhile.
    fn finish(&self, key: &ObjectKey) {
        let requeue = {
            let mut inner = self.inner.lock();
            inner.in_flight.remove(key);
            inner.dirty.remove(key)
        };
        if requeue {
            self.add(key.clone());
        }
    }

    fn reset_failures(&self, key: &ObjectKey) {
        self.inner.lock().failures.remove(key);
    }

    /// Record a failure and return the delay before the next attempt.
    fn backoff_delay(&self, key: &ObjectKey, config: &DispatcherConfig) -> Duration {
        let mut inner = self.inner.lock();
        let count = inner.failures.entry(key.clone()).or_insert(0);
        *count += 1;
        let exponent = (*count - 1).min(16);
        config
            .base_backoff
            .saturating_mul(1u32 << exponent)
            .min(config.max_backoff)
    }

    fn begin_shutdown(&self) {
        let _ = self.shutdown.send(true);
        self.notify.notify_waiters();
    }
}

/// Handle to a running dispatcher.
pub struct DispatcherHandle {
    queue: Arc<WorkQueue>,
    tasks: Vec<JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Schedule a key directly (used to seed the initial full pass).
    pub fn enqueue(&self, key: ObjectKey) {
        self.queue.add(key);
    }

    /// Schedule several keys.
    pub fn seed(&self, keys: impl IntoIterator<Item = ObjectKey>) {
        for key in keys {
            self.queue.add(key);
        }
    }

    /// Stop admitting new work, drain in-flight reconciles, and wait for
    /// the workers and event pump to exit.
    pub async fn shutdown(self) {
        self.queue.begin_shutdown();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Starts dispatchers. Stateless; the running pieces live in the returned
/// handle.
pub struct Dispatcher;

impl Dispatcher {
    /// Start a dispatcher for `reconciler`, fed by `events`.
    pub fn start<R: Reconciler>(
        reconciler: Arc<R>,
        events: broadcast::Receiver<WatchEvent>,
        config: DispatcherConfig,
    ) -> DispatcherHandle {
        let queue = Arc::new(WorkQueue::new());
        let mut tasks = Vec::with_capacity(config.workers + 1);

        tasks.push(tokio::spawn(Self::pump_events(
            Arc::clone(&reconciler),
            Arc::clone(&queue),
            events,
        )));

        for _ in 0..config.workers.max(1) {
            tasks.push(tokio::spawn(Self::worker(
                Arc::clone(&reconciler),
                Arc::clone(&queue),
                config,
            )));
        }

        DispatcherHandle { queue, tasks }
    }

    async fn pump_events<R: Reconciler>(
        reconciler: Arc<R>,
        queue: Arc<WorkQueue>,
        mut events: broadcast::Receiver<WatchEvent>,
    ) {
        let mut shutdown_rx = queue.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if queue.is_shutdown() {
                        return;
                    }
                }
                result = events.recv() => match result {
                    Ok(event) => {
                        for key in reconciler.map_event(&event) {
                            queue.add(key);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Level-triggered: skipped events only mean we may
                        // reconcile against fresher state than they carried.
                        warn!(
                            reconciler = reconciler.name(),
                            missed, "watch lagged, events coalesced"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    }

    async fn worker<R: Reconciler>(
        reconciler: Arc<R>,
        queue: Arc<WorkQueue>,
        config: DispatcherConfig,
    ) {
        while let Some(key) = queue.take().await {
            match reconciler.reconcile(&key).await {
                Ok(()) => {
                    debug!(reconciler = reconciler.name(), key = %key, "reconciled");
                    queue.reset_failures(&key);
                }
                Err(error) => {
                    let delay = queue.backoff_delay(&key, &config);
                    warn!(
                        reconciler = reconciler.name(),
                        key = %key,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "reconcile failed, backing off"
                    );
                    let retry_queue = Arc::clone(&queue);
                    let retry_key = key.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        retry_queue.add(retry_key);
                    });
                }
            }
            queue.finish(&key);
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
