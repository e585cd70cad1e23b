// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure mapping from watch events to the keys of the resources that must
//! be reconciled in response. No store access: everything needed is on the
//! event's object, so these functions are testable in isolation.

use gw_core::{ObjectKey, ResourceKind, WORKSPACE_LABEL};
use gw_store::{AnyObject, WatchEvent};

/// Workspace keys affected by an event: the workspace itself, any child
/// with a Workspace controller owner, a state secret carrying the
/// workspace label, and any run referencing the workspace.
pub fn map_to_workspace(event: &WatchEvent) -> Vec<ObjectKey> {
    let object = &event.object;
    let namespace = &object.meta().namespace;
    match object {
        AnyObject::Workspace(ws) => vec![ws.meta.key()],
        AnyObject::Run(run) if !run.spec.workspace.is_empty() => {
            vec![ObjectKey::new(namespace, &run.spec.workspace)]
        }
        AnyObject::Secret(secret) => secret
            .meta
            .labels
            .get(WORKSPACE_LABEL)
            .map(|ws_name| vec![ObjectKey::new(namespace, ws_name)])
            .unwrap_or_default(),
        AnyObject::Pod(_) | AnyObject::VolumeClaim(_) | AnyObject::ConfigMap(_) => {
            owned_workspace(object)
        }
        _ => Vec::new(),
    }
}

/// Run keys affected by an event: the run itself, a pod with a Run
/// controller owner, and (since admission depends on the workspace's
/// queue) every run queued on a changed workspace.
pub fn map_to_run(event: &WatchEvent) -> Vec<ObjectKey> {
    let object = &event.object;
    let namespace = object.meta().namespace.clone();
    match object {
        AnyObject::Run(run) => vec![run.meta.key()],
        AnyObject::Workspace(ws) => ws
            .status
            .queue
            .iter()
            .map(|run_name| ObjectKey::new(&namespace, run_name))
            .collect(),
        AnyObject::Pod(pod) => pod
            .meta
            .controller_owner()
            .filter(|owner| owner.kind == ResourceKind::Run)
            .map(|owner| vec![ObjectKey::new(&namespace, &owner.name)])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn owned_workspace(object: &AnyObject) -> Vec<ObjectKey> {
    object
        .meta()
        .controller_owner()
        .filter(|owner| owner.kind == ResourceKind::Workspace)
        .map(|owner| vec![ObjectKey::new(&object.meta().namespace, &owner.name)])
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod tests;
