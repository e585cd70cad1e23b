// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::setup_without_backup;
use gw_core::{RunPhase, Workspace};
use gw_store::StoreExt;

async fn annotate_approval(ctx: &crate::test_helpers::TestContext, ws_name: &str, run_name: &str) {
    let mut ws = ctx.get_workspace(ws_name).await;
    ws.meta.annotations.insert(
        Workspace::approval_annotation_key(run_name),
        "approved".to_string(),
    );
    ctx.store.update_as(ws).await.unwrap();
}

#[tokio::test]
async fn approval_for_missing_run_is_pruned() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    annotate_approval(&ctx, "foo", "ghost-run").await;
    ctx.reconcile_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert!(!ws.is_approved("ghost-run"));
}

#[tokio::test]
async fn approval_for_completed_run_is_pruned() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    let mut run = ctx.create_run("run-a", "foo", "apply").await;
    run.status.record_phase(RunPhase::Completed, 1);
    ctx.store.update_status_as(run).await.unwrap();

    annotate_approval(&ctx, "foo", "run-a").await;
    ctx.reconcile_workspace("foo").await.unwrap();

    // A future run reusing the name must not inherit the old approval.
    let ws = ctx.get_workspace("foo").await;
    assert!(!ws.is_approved("run-a"));
}

#[tokio::test]
async fn approval_for_live_run_is_retained() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    let mut run = ctx.create_run("run-a", "foo", "apply").await;
    run.status.record_phase(RunPhase::Running, 1);
    ctx.store.update_status_as(run).await.unwrap();

    annotate_approval(&ctx, "foo", "run-a").await;
    ctx.reconcile_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert!(ws.is_approved("run-a"));
}

#[tokio::test]
async fn unrelated_annotations_are_untouched() {
    let ctx = setup_without_backup();
    ctx.create_workspace("foo").await;
    ctx.settle_workspace("foo").await.unwrap();

    let mut ws = ctx.get_workspace("foo").await;
    ws.meta
        .annotations
        .insert("team.example.com/owner".to_string(), "platform".to_string());
    ws.meta.annotations.insert(
        Workspace::approval_annotation_key("ghost-run"),
        "approved".to_string(),
    );
    ctx.store.update_as(ws).await.unwrap();

    ctx.reconcile_workspace("foo").await.unwrap();

    let ws = ctx.get_workspace("foo").await;
    assert!(!ws.is_approved("ghost-run"));
    assert_eq!(
        ws.meta
            .annotations
            .get("team.example.com/owner")
            .map(String::as_str),
        Some("platform")
    );
}
