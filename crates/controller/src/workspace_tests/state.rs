// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{setup, setup_without_backup, state_secret};
use crate::error::ReconcileError;
use crate::events::EventType;
use gw_core::{ObjectKey, ResourceKind, Secret, STATE_DATA_KEY};
use gw_store::StoreExt;

#[tokio::test]
async fn no_secret_and_no_provider_proceeds() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.serial, None);
    assert_eq!(ws.status.backup_serial, None);
}

#[tokio::test]
async fn no_secret_and_no_backup_skips_restore() {
    let ctx = setup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    // Restore was attempted by the deterministic key, found nothing, and
    // that is fine: first-run case.
    assert_eq!(ctx.provider.restore_count(), 1);
    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.backup_serial, None);
    assert!(ctx.recorder.reasons().contains(&"RestoreSkipped".to_string()));
}

#[tokio::test]
async fn restore_creates_secret_and_records_serial() {
    let ctx = setup();
    let ws = ctx.create_workspace("foo").await;
    ctx.provider.seed_backup(state_secret(&ws, 5));

    ctx.settle_workspace("foo").await.unwrap();

    let secret: Secret = ctx
        .store
        .get_as(&ObjectKey::new("default", ws.state_secret_name()))
        .await
        .unwrap();
    assert!(!secret.data.is_empty());

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.serial, Some(5));
    assert_eq!(ws.status.backup_serial, Some(5));
    assert!(ctx
        .recorder
        .reasons()
        .contains(&"RestoreSuccessful".to_string()));

    // The freshly restored state must not be immediately re-backed-up.
    ctx.reconcile_workspace("foo").await.unwrap();
    assert_eq!(ctx.provider.backup_count(), 0);
}

#[tokio::test]
async fn present_secret_is_parsed_owned_and_backed_up() {
    let ctx = setup();
    let ws = ctx.create_workspace("foo").await;
    ctx.put_state_secret(&ws, 3).await;

    ctx.settle_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.serial, Some(3));
    assert_eq!(ws.status.backup_serial, Some(3));
    assert_eq!(
        ws.status.outputs.get("ip").map(String::as_str),
        Some("10.0.0.1")
    );
    assert_eq!(ctx.provider.backup_count(), 1);
    assert!(ctx
        .recorder
        .reasons()
        .contains(&"BackupSuccessful".to_string()));

    // Deleting the workspace now deletes the state with it.
    let secret: Secret = ctx
        .store
        .get_as(&ObjectKey::new("default", ws.state_secret_name()))
        .await
        .unwrap();
    assert!(secret.meta.is_owned_by(ResourceKind::Workspace, "foo"));
}

#[tokio::test]
async fn backup_triggers_only_on_serial_change() {
    let ctx = setup();
    let ws = ctx.create_workspace("foo").await;
    ctx.put_state_secret(&ws, 3).await;
    ctx.settle_workspace("foo").await.unwrap();
    assert_eq!(ctx.provider.backup_count(), 1);

    // Unchanged serial: no backup, however often we reconcile.
    ctx.reconcile_workspace("foo").await.unwrap();
    ctx.reconcile_workspace("foo").await.unwrap();
    assert_eq!(ctx.provider.backup_count(), 1);

    // New serial: exactly one more backup.
    ctx.put_state_secret(&ws, 4).await;
    ctx.reconcile_workspace("foo").await.unwrap();
    assert_eq!(ctx.provider.backup_count(), 2);
    assert_eq!(ctx.get_workspace("foo").await.status.backup_serial, Some(4));
}

#[tokio::test]
async fn ephemeral_workspace_never_backs_up() {
    let ctx = setup();
    let mut ws = ctx.create_workspace("foo").await;
    ws.spec.ephemeral = true;
    let ws = ctx.store.update_as(ws).await.unwrap();
    ctx.put_state_secret(&ws, 3).await;

    ctx.settle_workspace("foo").await.unwrap();

    assert_eq!(ctx.provider.backup_count(), 0);
    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.serial, Some(3));
    assert_eq!(ws.status.backup_serial, None);
}

#[tokio::test]
async fn backup_failure_is_warned_and_retried() {
    let ctx = setup();
    let ws = ctx.create_workspace("foo").await;
    ctx.put_state_secret(&ws, 3).await;
    ctx.provider.fail_backup("bucket unreachable");

    let err = ctx.settle_workspace("foo").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Provider(_)));

    let events = ctx.recorder.events();
    let warning = events
        .iter()
        .find(|e| e.reason == "BackupError")
        .expect("warning recorded");
    assert_eq!(warning.event_type, EventType::Warning);

    // The serial is not recorded as backed up, so the retry backs up again.
    assert_eq!(ctx.get_workspace("foo").await.status.backup_serial, None);
}

#[tokio::test]
async fn restore_failure_is_warned_and_retried() {
    let ctx = setup();
    ctx.create_workspace("foo").await;
    ctx.provider.fail_restore("bucket unreachable");

    let err = ctx.settle_workspace("foo").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Provider(_)));
    assert!(ctx.recorder.reasons().contains(&"RestoreError".to_string()));
}

#[tokio::test]
async fn malformed_state_is_surfaced() {
    let ctx = setup();
    let ws = ctx.create_workspace("foo").await;

    let mut secret = state_secret(&ws, 1);
    secret
        .data
        .insert(STATE_DATA_KEY.to_string(), b"not json".to_vec());
    ctx.store.create_as(secret).await.unwrap();

    let err = ctx.settle_workspace("foo").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Parse(_)));
    assert!(ctx
        .recorder
        .reasons()
        .contains(&"StateParseError".to_string()));
}
