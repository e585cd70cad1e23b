// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gw_core::Workspace;
use gw_store::{AnyObject, WatchAction};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Reconciler stub recording calls and failing on demand.
struct StubReconciler {
    calls: Mutex<Vec<ObjectKey>>,
    /// Keys that fail this many more times before succeeding.
    failures: Mutex<HashMap<ObjectKey, u32>>,
    /// Per-call artificial latency, to create overlap windows.
    latency: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    active_per_key: Mutex<HashMap<ObjectKey, usize>>,
    overlapped_same_key: AtomicUsize,
}

impl StubReconciler {
    fn new(latency: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            latency,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            active_per_key: Mutex::new(HashMap::new()),
            overlapped_same_key: AtomicUsize::new(0),
        }
    }

    fn fail_times(&self, key: ObjectKey, times: u32) {
        self.failures.lock().insert(key, times);
    }

    fn calls_for(&self, key: &ObjectKey) -> usize {
        self.calls.lock().iter().filter(|k| *k == key).count()
    }
}

#[async_trait]
impl Reconciler for StubReconciler {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn map_event(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        vec![event.object.key()]
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<(), ReconcileError> {
        self.calls.lock().push(key.clone());

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        {
            let mut per_key = self.active_per_key.lock();
            let count = per_key.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                self.overlapped_same_key.fetch_add(1, Ordering::SeqCst);
            }
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        {
            let mut per_key = self.active_per_key.lock();
            if let Some(count) = per_key.get_mut(key) {
                *count -= 1;
            }
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let should_fail = {
            let mut failures = self.failures.lock();
            match failures.get_mut(key) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if should_fail {
            return Err(ReconcileError::UnrecognizedPhase {
                kind: "stub",
                phase: "injected".to_string(),
            });
        }
        Ok(())
    }
}

fn key(name: &str) -> ObjectKey {
    ObjectKey::new("default", name)
}

fn ws_event(name: &str) -> WatchEvent {
    WatchEvent::new(
        WatchAction::Modified,
        AnyObject::from(Workspace::new("default", name)),
    )
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(start_paused = true)]
async fn events_are_mapped_and_reconciled() {
    let stub = Arc::new(StubReconciler::new(Duration::ZERO));
    let (tx, rx) = broadcast::channel(16);
    let handle = Dispatcher::start(Arc::clone(&stub), rx, DispatcherConfig::default());

    tx.send(ws_event("foo")).unwrap();
    wait_until(|| stub.calls_for(&key("foo")) >= 1).await;

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pending_duplicates_coalesce() {
    // Single worker so the first key occupies it while more events arrive.
    let config = DispatcherConfig {
        workers: 1,
        ..DispatcherConfig::default()
    };
    let stub = Arc::new(StubReconciler::new(Duration::from_millis(50)));
    let (tx, rx) = broadcast::channel(64);
    let handle = Dispatcher::start(Arc::clone(&stub), rx, config);

    // Occupy the worker, then flood the same key.
    tx.send(ws_event("busy")).unwrap();
    for _ in 0..10 {
        tx.send(ws_event("flood")).unwrap();
    }

    wait_until(|| stub.calls_for(&key("flood")) >= 1).await;
    handle.shutdown().await;

    // Ten events collapse into at most two passes: one in flight plus one
    // follow-up for events that arrived meanwhile.
    let calls = stub.calls_for(&key("flood"));
    assert!((1..=2).contains(&calls), "expected 1-2 calls, got {calls}");
}

#[tokio::test(start_paused = true)]
async fn same_key_never_overlaps_while_distinct_keys_run_in_parallel() {
    let config = DispatcherConfig {
        workers: 4,
        ..DispatcherConfig::default()
    };
    let stub = Arc::new(StubReconciler::new(Duration::from_millis(20)));
    let (tx, rx) = broadcast::channel(64);
    let handle = Dispatcher::start(Arc::clone(&stub), rx, config);

    for round in 0..5 {
        for name in ["a", "b", "c"] {
            tx.send(ws_event(name)).unwrap();
        }
        // Stagger rounds so re-enqueues land while keys are in flight.
        if round % 2 == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    wait_until(|| {
        stub.calls_for(&key("a")) >= 1
            && stub.calls_for(&key("b")) >= 1
            && stub.calls_for(&key("c")) >= 1
    })
    .await;
    handle.shutdown().await;

    assert_eq!(stub.overlapped_same_key.load(Ordering::SeqCst), 0);
    assert!(stub.max_active.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn failed_keys_are_retried_with_backoff() {
    let stub = Arc::new(StubReconciler::new(Duration::ZERO));
    stub.fail_times(key("flaky"), 3);
    let (tx, rx) = broadcast::channel(16);
    let handle = Dispatcher::start(Arc::clone(&stub), rx, DispatcherConfig::default());

    tx.send(ws_event("flaky")).unwrap();
    // Three failures plus the final success.
    wait_until(|| stub.calls_for(&key("flaky")) >= 4).await;

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_admitting_work() {
    let stub = Arc::new(StubReconciler::new(Duration::ZERO));
    let (tx, rx) = broadcast::channel(16);
    let handle = Dispatcher::start(Arc::clone(&stub), rx, DispatcherConfig::default());

    tx.send(ws_event("before")).unwrap();
    wait_until(|| stub.calls_for(&key("before")) >= 1).await;
    handle.shutdown().await;

    // Events after shutdown go nowhere.
    let _ = tx.send(ws_event("after"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(stub.calls_for(&key("after")), 0);
}

#[tokio::test(start_paused = true)]
async fn seeded_keys_are_reconciled() {
    let stub = Arc::new(StubReconciler::new(Duration::ZERO));
    let (_tx, rx) = broadcast::channel::<WatchEvent>(16);
    let handle = Dispatcher::start(Arc::clone(&stub), rx, DispatcherConfig::default());

    handle.seed([key("one"), key("two")]);
    wait_until(|| stub.calls_for(&key("one")) >= 1 && stub.calls_for(&key("two")) >= 1).await;

    handle.shutdown().await;
}
