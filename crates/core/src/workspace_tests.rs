// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::condition::set_condition;

#[test]
fn child_names_are_deterministic() {
    let ws = Workspace::new("default", "foo");
    assert_eq!(ws.pod_name(), "workspace-foo");
    assert_eq!(ws.claim_name(), "workspace-foo");
    assert_eq!(ws.builtins_config_name(), "workspace-builtins-foo");
    assert_eq!(ws.state_secret_name(), "state-default-foo");
    assert_eq!(ws.backend_workspace(), "default-foo");
}

#[test]
fn approval_key_round_trip() {
    let key = Workspace::approval_annotation_key("run-1");
    assert_eq!(key, "approved.groundwork.dev/run-1");
    assert_eq!(Workspace::run_name_from_approval_key(&key), Some("run-1"));
    assert_eq!(Workspace::run_name_from_approval_key("other/run-1"), None);
}

#[test]
fn is_approved_checks_annotation_presence() {
    let mut ws = Workspace::new("default", "foo");
    assert!(!ws.is_approved("run-1"));
    ws.meta.annotations.insert(
        Workspace::approval_annotation_key("run-1"),
        "approved".to_string(),
    );
    assert!(ws.is_approved("run-1"));
    assert!(!ws.is_approved("run-2"));
}

#[test]
fn is_privileged_consults_spec() {
    let mut ws = Workspace::new("default", "foo");
    ws.spec.privileged_commands = vec!["apply".to_string(), "destroy".to_string()];
    assert!(ws.is_privileged("apply"));
    assert!(!ws.is_privileged("plan"));
}

#[yare::parameterized(
    ready = { ConditionReason::Ready, WorkspacePhase::Ready },
    deleting = { ConditionReason::Deleting, WorkspacePhase::Deleting },
    failure = { ConditionReason::Failure, WorkspacePhase::Error },
    pending = { ConditionReason::Pending, WorkspacePhase::Initializing },
    unknown = { ConditionReason::Unknown, WorkspacePhase::Unknown },
)]
fn phase_follows_ready_reason(reason: ConditionReason, expected: WorkspacePhase) {
    let mut ws = Workspace::new("default", "foo");
    set_condition(
        &mut ws.status.conditions,
        Condition {
            type_: ConditionType::Ready,
            status: ConditionStatus::Unknown,
            reason,
            message: String::new(),
            last_transition_ms: 0,
        },
    );
    assert_eq!(ws.derive_phase(), expected);
}

#[test]
fn phase_without_ready_condition_is_unknown() {
    let ws = Workspace::new("default", "foo");
    assert_eq!(ws.derive_phase(), WorkspacePhase::Unknown);
}

#[test]
fn workspace_serde_round_trip() {
    let mut ws = Workspace::new("default", "foo");
    ws.spec.privileged_commands = vec!["destroy".to_string()];
    ws.status.serial = Some(3);
    ws.status
        .outputs
        .insert("ip".to_string(), "10.0.0.1".to_string());
    let json = serde_json::to_string(&ws).unwrap();
    let parsed: Workspace = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ws);
}
