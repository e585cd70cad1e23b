// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval gate: annotation-based authorization for privileged commands.
//!
//! Setting an approval annotation is an externally authorized action; the
//! reconciler only prunes annotations that are no longer valid: those
//! whose run no longer exists, or whose run completed. Pruning bounds
//! annotation growth and prevents an old approval from being reused
//! against a future run with the same name.

use super::WorkspaceReconciler;
use crate::error::ReconcileError;
use gw_core::{Clock, ObjectKey, Run, RunPhase, Workspace};
use gw_store::StoreExt;
use std::collections::BTreeMap;

impl<C: Clock> WorkspaceReconciler<C> {
    /// The workspace's annotations with stale approvals removed.
    /// Non-approval annotations are never touched. Callers compare the
    /// result structurally against the current map and only write on
    /// change.
    pub(crate) async fn pruned_approvals(
        &self,
        ws: &Workspace,
    ) -> Result<BTreeMap<String, String>, ReconcileError> {
        let mut annotations = ws.meta.annotations.clone();
        if annotations.is_empty() {
            return Ok(annotations);
        }

        let approval_keys: Vec<String> = annotations
            .keys()
            .filter(|k| Workspace::run_name_from_approval_key(k).is_some())
            .cloned()
            .collect();

        for key in approval_keys {
            let run_name = match Workspace::run_name_from_approval_key(&key) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let run_key = ObjectKey::new(&ws.meta.namespace, &run_name);
            match self.store.get_as::<Run>(&run_key).await {
                // The approved run is gone; the approval means nothing now.
                Err(e) if e.is_not_found() => {
                    annotations.remove(&key);
                }
                Err(e) => return Err(e.into()),
                // A completed run's approval must not linger, or a future
                // run reusing the name would inherit it.
                Ok(run) if run.status.phase == RunPhase::Completed => {
                    annotations.remove(&key);
                }
                Ok(_) => {}
            }
        }

        Ok(annotations)
    }
}
