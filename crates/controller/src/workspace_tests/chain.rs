// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::setup_without_backup;
use crate::error::ReconcileError;
use gw_core::{
    ClaimPhase, ConditionReason, ConfigMap, Object, ObjectKey, PodPhase, ResourceKind, Role,
    RoleBinding, ServiceAccount, VolumeClaim, WorkspacePhase, CASCADE_FINALIZER,
};
use gw_store::{Store, StoreExt};

#[tokio::test]
async fn first_reconcile_adds_cascade_finalizer() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;

    ctx.reconcile_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert!(ws.meta.has_finalizer(CASCADE_FINALIZER));
    // First pass stops after persisting the finalizer; no children yet.
    assert!(ctx
        .store
        .get_as::<ConfigMap>(&ObjectKey::new("default", ws.builtins_config_name()))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn initial_pass_creates_children_and_reports_pending() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;

    // All children exist.
    ctx.store
        .get_as::<ConfigMap>(&ObjectKey::new("default", ws.builtins_config_name()))
        .await
        .unwrap();
    ctx.store
        .get_as::<VolumeClaim>(&ObjectKey::new("default", ws.claim_name()))
        .await
        .unwrap();
    ctx.store
        .get_as::<gw_core::Pod>(&ObjectKey::new("default", ws.pod_name()))
        .await
        .unwrap();
    ctx.store
        .get_as::<ServiceAccount>(&ObjectKey::new("default", "groundwork"))
        .await
        .unwrap();
    ctx.store
        .get_as::<Role>(&ObjectKey::new("default", "groundwork"))
        .await
        .unwrap();
    ctx.store
        .get_as::<RoleBinding>(&ObjectKey::new("default", "groundwork"))
        .await
        .unwrap();

    // The pod was created last, so the Ready condition reports it.
    let ready = ws.ready_condition().unwrap();
    assert_eq!(ready.reason, ConditionReason::Pending);
    assert_eq!(ready.message, "Creating pod");
    assert_eq!(ws.status.phase, WorkspacePhase::Initializing);
}

#[tokio::test]
async fn becomes_ready_when_claim_binds_and_pod_runs() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    let ws = ctx.make_ready("foo").await;

    let ready = ws.ready_condition().unwrap();
    assert_eq!(ready.reason, ConditionReason::Ready);
    assert_eq!(ready.message, "Pod is running");
    assert_eq!(ws.status.phase, WorkspacePhase::Ready);
}

#[tokio::test]
async fn reconciling_unchanged_workspace_is_idempotent() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    let before = ctx.make_ready("foo").await;
    let objects_before = ctx.store.contents().len();

    ctx.clock.advance_ms(60_000);
    ctx.reconcile_workspace("foo").await.unwrap();

    let after = ctx.get_workspace("foo").await;
    assert_eq!(objects_before, ctx.store.contents().len());
    // Same conditions, same transition timestamps, same version: the
    // unchanged status write was a no-op.
    assert_eq!(after.status.conditions, before.status.conditions);
    assert_eq!(after.meta.resource_version, before.meta.resource_version);
}

#[tokio::test]
async fn deletion_short_circuits_the_chain() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    let ws = ctx.make_ready("foo").await;

    // Remove the pod, then request deletion: a deleting workspace must not
    // recreate children.
    ctx.store
        .finalize(ResourceKind::Pod, &ObjectKey::new("default", ws.pod_name()))
        .unwrap();
    ctx.store
        .delete(ResourceKind::Workspace, &ws.key())
        .await
        .unwrap();

    ctx.reconcile_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.phase, WorkspacePhase::Deleting);
    assert_eq!(
        ws.ready_condition().unwrap().reason,
        ConditionReason::Deleting
    );
    assert!(ctx
        .store
        .get_as::<gw_core::Pod>(&ObjectKey::new("default", ws.pod_name()))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn lost_claim_is_terminal_failure() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    let ws = ctx.make_ready("foo").await;

    ctx.set_claim_phase(&ws.claim_name(), ClaimPhase::Lost).await;
    let err = ctx.reconcile_workspace("foo").await.unwrap_err();
    assert!(matches!(err, ReconcileError::ClaimLost));

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.phase, WorkspacePhase::Error);
    assert_eq!(
        ws.ready_condition().unwrap().reason,
        ConditionReason::Failure
    );
    assert!(ctx.recorder.reasons().contains(&"CacheLost".to_string()));
}

#[tokio::test]
async fn unknown_claim_phase_forces_retry() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    let ws = ctx.make_ready("foo").await;

    ctx.set_claim_phase(&ws.claim_name(), ClaimPhase::Unknown)
        .await;
    let err = ctx.reconcile_workspace("foo").await.unwrap_err();
    assert!(matches!(err, ReconcileError::UnrecognizedPhase { .. }));

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.phase, WorkspacePhase::Unknown);
}

#[tokio::test]
async fn succeeded_pod_is_a_failure() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    let ws = ctx.make_ready("foo").await;

    // The workspace pod idles forever; a clean exit is still wrong.
    ctx.set_pod_phase(&ws.pod_name(), PodPhase::Succeeded).await;
    ctx.reconcile_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.phase, WorkspacePhase::Error);
    assert_eq!(
        ws.ready_condition().unwrap().message,
        "Pod unexpectedly exited"
    );
}

#[tokio::test]
async fn queue_is_written_to_status() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.create_run("run-b", "foo", "plan").await;

    ctx.settle_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert_eq!(ws.status.queue, vec!["run-a", "run-b"]);
}

#[tokio::test]
async fn rbac_is_shared_across_workspaces() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_workspace("bar").await;
    ctx.settle_workspace("foo").await.unwrap();
    ctx.settle_workspace("bar").await.unwrap();

    let accounts: Vec<ServiceAccount> = ctx.store.list_as("default").await.unwrap();
    let roles: Vec<Role> = ctx.store.list_as("default").await.unwrap();
    let bindings: Vec<RoleBinding> = ctx.store.list_as("default").await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(roles.len(), 1);
    assert_eq!(bindings.len(), 1);

    // Shared infrastructure must outlive any single workspace: no owner
    // references anywhere on the triple.
    assert!(accounts[0].meta.owner_references.is_empty());
    assert!(roles[0].meta.owner_references.is_empty());
    assert!(bindings[0].meta.owner_references.is_empty());
}

#[tokio::test]
async fn service_account_is_never_overwritten() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    // A user enables identity federation via an annotation.
    let mut sa: ServiceAccount = ctx
        .store
        .get_as(&ObjectKey::new("default", "groundwork"))
        .await
        .unwrap();
    sa.meta
        .annotations
        .insert("iam.example.com/role".to_string(), "deployer".to_string());
    ctx.store.update_as(sa).await.unwrap();

    ctx.reconcile_workspace("foo").await.unwrap();

    let sa: ServiceAccount = ctx
        .store
        .get_as(&ObjectKey::new("default", "groundwork"))
        .await
        .unwrap();
    assert_eq!(
        sa.meta.annotations.get("iam.example.com/role").map(String::as_str),
        Some("deployer")
    );
}

#[tokio::test]
async fn role_drift_is_reconciled() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    let mut role: Role = ctx
        .store
        .get_as(&ObjectKey::new("default", "groundwork"))
        .await
        .unwrap();
    let desired_rules = role.rules.clone();
    role.rules.clear();
    ctx.store.update_as(role).await.unwrap();

    ctx.reconcile_workspace("foo").await.unwrap();

    let role: Role = ctx
        .store
        .get_as(&ObjectKey::new("default", "groundwork"))
        .await
        .unwrap();
    assert_eq!(role.rules, desired_rules);
}

#[tokio::test]
async fn reconcile_of_absent_workspace_is_a_no_op() {
    let ctx = setup_without_backup();
    ctx.reconcile_workspace("ghost").await.unwrap();
    assert!(ctx.store.contents().is_empty());
}

#[tokio::test]
async fn status_write_survives_concurrent_spec_edit() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    // Another actor edits the spec between our fetch and our status write.
    // Re-fetch-then-patch means the edit survives.
    let mut ws = ctx.get_workspace("foo").await;
    ws.spec.ephemeral = true;
    ctx.store.update_as(ws).await.unwrap();

    ctx.reconcile_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert!(ws.spec.ephemeral);
    assert!(!ws.status.conditions.is_empty());
}
