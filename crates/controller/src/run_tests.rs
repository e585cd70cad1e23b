// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run reconciler tests.

use crate::test_helpers::setup_without_backup;
use gw_core::{ObjectKey, Pod, PodPhase, RunPhase, Workspace};
use gw_store::StoreExt;

#[tokio::test]
async fn run_without_workspace_stays_pending() {
    let ctx = setup_without_backup();
    ctx.create_run("run-a", "ghost", "plan").await;
    ctx.reconcile_run("run-a").await.unwrap();
    assert_eq!(ctx.get_run("run-a").await.status.phase, RunPhase::Pending);
}

#[tokio::test]
async fn admitted_run_gets_a_pod() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.make_ready("foo").await;

    ctx.reconcile_run("run-a").await.unwrap();

    let pod: Pod = ctx
        .store
        .get_as(&ObjectKey::new("default", "run-a"))
        .await
        .unwrap();
    assert_eq!(pod.meta.controller_owner().unwrap().name, "run-a");
    assert_eq!(ctx.get_run("run-a").await.status.phase, RunPhase::Pending);
}

#[tokio::test]
async fn waiting_run_is_queued_without_a_pod() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.create_run("run-b", "foo", "plan").await;
    ctx.make_ready("foo").await;

    ctx.reconcile_run("run-a").await.unwrap();
    ctx.reconcile_run("run-b").await.unwrap();

    assert_eq!(ctx.get_run("run-b").await.status.phase, RunPhase::Queued);
    assert!(ctx
        .store
        .get_as::<Pod>(&ObjectKey::new("default", "run-b"))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn pod_phase_is_mirrored_into_run() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.make_ready("foo").await;
    ctx.reconcile_run("run-a").await.unwrap();

    ctx.set_pod_phase("run-a", PodPhase::Running).await;
    ctx.reconcile_run("run-a").await.unwrap();
    assert_eq!(ctx.get_run("run-a").await.status.phase, RunPhase::Running);

    ctx.set_pod_phase("run-a", PodPhase::Succeeded).await;
    ctx.reconcile_run("run-a").await.unwrap();
    let run = ctx.get_run("run-a").await;
    assert_eq!(run.status.phase, RunPhase::Completed);
    assert!(run.is_terminal());

    // Phase history: pending -> running -> completed.
    let phases: Vec<RunPhase> = run.status.transitions.iter().map(|t| t.phase).collect();
    assert_eq!(
        phases,
        vec![RunPhase::Pending, RunPhase::Running, RunPhase::Completed]
    );
}

#[tokio::test]
async fn completion_promotes_the_next_run() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.create_run("run-b", "foo", "plan").await;
    ctx.make_ready("foo").await;

    ctx.reconcile_run("run-a").await.unwrap();
    ctx.set_pod_phase("run-a", PodPhase::Succeeded).await;
    ctx.reconcile_run("run-a").await.unwrap();

    // The workspace recomputes its queue; run-b moves to position 0 and is
    // admitted on its next reconcile.
    ctx.reconcile_workspace("foo").await.unwrap();
    assert_eq!(ctx.get_workspace("foo").await.status.queue, vec!["run-b"]);

    ctx.reconcile_run("run-b").await.unwrap();
    ctx.store
        .get_as::<Pod>(&ObjectKey::new("default", "run-b"))
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_pod_marks_run_error() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.make_ready("foo").await;
    ctx.reconcile_run("run-a").await.unwrap();

    ctx.set_pod_phase("run-a", PodPhase::Failed).await;
    ctx.reconcile_run("run-a").await.unwrap();

    let run = ctx.get_run("run-a").await;
    assert_eq!(run.status.phase, RunPhase::Error);
    assert!(run.is_terminal());
}

#[tokio::test]
async fn terminal_run_is_never_touched() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.make_ready("foo").await;
    ctx.reconcile_run("run-a").await.unwrap();
    ctx.set_pod_phase("run-a", PodPhase::Succeeded).await;
    ctx.reconcile_run("run-a").await.unwrap();

    let before = ctx.get_run("run-a").await;
    ctx.reconcile_run("run-a").await.unwrap();
    let after = ctx.get_run("run-a").await;
    assert_eq!(after, before);
}

#[tokio::test]
async fn privileged_command_waits_for_approval() {
    let ctx = setup_without_backup();
    let mut ws = ctx.create_workspace("foo").await;
    ws.spec.privileged_commands = vec!["apply".to_string()];
    ctx.store.update_as(ws).await.unwrap();
    ctx.create_run("run-a", "foo", "apply").await;
    ctx.make_ready("foo").await;

    // Admitted by the queue, but gated on approval: no pod.
    ctx.reconcile_run("run-a").await.unwrap();
    assert_eq!(ctx.get_run("run-a").await.status.phase, RunPhase::Queued);
    assert!(ctx
        .store
        .get_as::<Pod>(&ObjectKey::new("default", "run-a"))
        .await
        .unwrap_err()
        .is_not_found());

    // Approval arrives (set by an externally authorized actor).
    let mut ws = ctx.get_workspace("foo").await;
    ws.meta.annotations.insert(
        Workspace::approval_annotation_key("run-a"),
        "approved".to_string(),
    );
    ctx.store.update_as(ws).await.unwrap();

    ctx.reconcile_run("run-a").await.unwrap();
    ctx.store
        .get_as::<Pod>(&ObjectKey::new("default", "run-a"))
        .await
        .unwrap();
}

#[tokio::test]
async fn non_privileged_command_needs_no_approval() {
    let ctx = setup_without_backup();
    let mut ws = ctx.create_workspace("foo").await;
    ws.spec.privileged_commands = vec!["apply".to_string()];
    ctx.store.update_as(ws).await.unwrap();
    ctx.create_run("run-a", "foo", "plan").await;
    ctx.make_ready("foo").await;

    ctx.reconcile_run("run-a").await.unwrap();
    ctx.store
        .get_as::<Pod>(&ObjectKey::new("default", "run-a"))
        .await
        .unwrap();
}
