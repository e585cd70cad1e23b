// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{ObjectVariant, StoreExt, WatchAction};
use gw_core::{FakeClock, Object, Run, RunPhase, Workspace, CASCADE_FINALIZER};

fn store() -> (MemoryStore<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (MemoryStore::new(clock.clone()), clock)
}

#[tokio::test]
async fn create_and_get_round_trip() {
    let (store, _) = store();
    let created = store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap();
    assert!(created.meta.resource_version > 0);
    assert_eq!(created.meta.creation_epoch_ms, FakeClock::EPOCH_BASE_MS);

    let fetched: Workspace = store
        .get_as(&ObjectKey::new("default", "foo"))
        .await
        .unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let (store, _) = store();
    let err = store
        .get_as::<Workspace>(&ObjectKey::new("default", "foo"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn create_twice_is_already_exists() {
    let (store, _) = store();
    store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap();
    let err = store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
}

#[tokio::test]
async fn list_filters_kind_and_namespace() {
    let (store, _) = store();
    store
        .create_as(Workspace::new("default", "b"))
        .await
        .unwrap();
    store
        .create_as(Workspace::new("default", "a"))
        .await
        .unwrap();
    store
        .create_as(Workspace::new("other", "c"))
        .await
        .unwrap();
    store
        .create_as(Run::new("default", "run-1", "a", "plan"))
        .await
        .unwrap();

    let listed: Vec<Workspace> = store.list_as("default").await.unwrap();
    let names: Vec<&str> = listed.iter().map(|w| w.meta.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn stale_update_conflicts() {
    let (store, _) = store();
    let ws = store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap();

    // A concurrent writer bumps the version.
    let mut fresh = ws.clone();
    fresh.spec.ephemeral = true;
    store.update_as(fresh).await.unwrap();

    // Our stale copy must be rejected.
    let err = store.update_as(ws).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn update_preserves_status_subresource() {
    let (store, _) = store();
    let mut ws = store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap();

    ws.status.serial = Some(9);
    let mut ws = store.update_status_as(ws).await.unwrap();
    assert_eq!(ws.status.serial, Some(9));

    // A spec write carrying a zeroed status must not clobber it.
    ws.spec.ephemeral = true;
    ws.status = Default::default();
    let updated = store.update_as(ws).await.unwrap();
    assert!(updated.spec.ephemeral);
    assert_eq!(updated.status.serial, Some(9));
}

#[tokio::test]
async fn update_status_preserves_spec_and_metadata() {
    let (store, _) = store();
    let mut run = store
        .create_as(Run::new("default", "run-1", "foo", "plan"))
        .await
        .unwrap();

    run.spec.command = "apply".to_string();
    run.status.record_phase(RunPhase::Running, 1);
    let updated = store.update_status_as(run).await.unwrap();

    // Spec change was dropped, status change kept.
    assert_eq!(updated.spec.command, "plan");
    assert_eq!(updated.status.phase, RunPhase::Running);
}

#[tokio::test]
async fn delete_with_finalizer_marks_deleting() {
    let (store, _) = store();
    let mut ws = Workspace::new("default", "foo");
    ws.meta.add_finalizer(CASCADE_FINALIZER);
    let ws = store.create_as(ws).await.unwrap();

    store
        .delete(ResourceKind::Workspace, &ws.key())
        .await
        .unwrap();
    let fetched: Workspace = store.get_as(&ws.key()).await.unwrap();
    assert!(fetched.meta.is_deleting());

    // Deleting again is a no-op, not an error.
    store
        .delete(ResourceKind::Workspace, &ws.key())
        .await
        .unwrap();

    // finalize() models the garbage collector finishing the job.
    store.finalize(ResourceKind::Workspace, &ws.key()).unwrap();
    assert!(store
        .get_as::<Workspace>(&ws.key())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn delete_without_finalizer_removes() {
    let (store, _) = store();
    let run = store
        .create_as(Run::new("default", "run-1", "foo", "plan"))
        .await
        .unwrap();
    store.delete(ResourceKind::Run, &run.key()).await.unwrap();
    assert!(store
        .get_as::<Run>(&run.key())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn writes_emit_watch_events() {
    let (store, _) = store();
    let mut watch = store.subscribe();

    let ws = store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap();
    store.update_as(ws.clone()).await.unwrap();
    store
        .delete(ResourceKind::Workspace, &ws.key())
        .await
        .unwrap();

    let added = watch.recv().await.unwrap();
    assert_eq!(added.action, WatchAction::Added);
    assert_eq!(added.object.key(), ws.key());

    let modified = watch.recv().await.unwrap();
    assert_eq!(modified.action, WatchAction::Modified);

    let deleted = watch.recv().await.unwrap();
    assert_eq!(deleted.action, WatchAction::Deleted);
}

#[tokio::test]
async fn unchanged_write_is_a_no_op() {
    let (store, _) = store();
    let mut watch = store.subscribe();
    let ws = store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap();
    watch.recv().await.unwrap(); // drain the Added event

    // Writing back an identical object must not bump the version or emit
    // an event; otherwise reconcilers re-trigger themselves forever.
    let same = store.update_as(ws.clone()).await.unwrap();
    assert_eq!(same.meta.resource_version, ws.meta.resource_version);
    let same = store.update_status_as(ws.clone()).await.unwrap();
    assert_eq!(same.meta.resource_version, ws.meta.resource_version);
    assert!(matches!(
        watch.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn wrong_kind_lookup_is_typed_error() {
    let (store, _) = store();
    store
        .create_as(Workspace::new("default", "foo"))
        .await
        .unwrap();
    let any = store
        .get(ResourceKind::Workspace, &ObjectKey::new("default", "foo"))
        .await
        .unwrap();
    let err = <Run as ObjectVariant>::from_any(any).unwrap_err();
    assert!(matches!(err, StoreError::WrongKind { .. }));
}
