// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace pod management. Last step in the chain: the pod reflects the
//! final observable infrastructure phase.

use super::WorkspaceReconciler;
use crate::builders;
use crate::error::ReconcileError;
use gw_core::{set_condition, Clock, ObjectKey, Pod, PodPhase, Workspace};
use gw_store::StoreExt;
use tracing::error;

impl<C: Clock> WorkspaceReconciler<C> {
    pub(crate) async fn manage_pod(&self, ws: &mut Workspace) -> Result<bool, ReconcileError> {
        let key = ObjectKey::new(&ws.meta.namespace, ws.pod_name());
        let pod: Pod = match self.store.get_as(&key).await {
            Ok(pod) => pod,
            Err(e) if e.is_not_found() => {
                let pod = builders::workspace_pod(ws, &self.image);
                self.store.create_as(pod).await?;
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::pending("Creating pod", self.clock.epoch_ms()),
                );
                return Ok(false);
            }
            Err(e) => {
                error!(pod = %key, error = %e, "unable to get pod");
                return Err(e.into());
            }
        };

        match pod.status.phase {
            PodPhase::Running => {
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::ready("Pod is running", self.clock.epoch_ms()),
                );
                Ok(false)
            }
            PodPhase::Pending => {
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::pending("Pod in pending phase", self.clock.epoch_ms()),
                );
                Ok(false)
            }
            PodPhase::Failed => {
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::failure("Pod failed", self.clock.epoch_ms()),
                );
                Ok(false)
            }
            // The workspace pod idles forever; exiting cleanly is still
            // wrong.
            PodPhase::Succeeded => {
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::failure("Pod unexpectedly exited", self.clock.epoch_ms()),
                );
                Ok(false)
            }
            PodPhase::Unknown => {
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::unknown("Pod state unknown", self.clock.epoch_ms()),
                );
                Err(ReconcileError::UnrecognizedPhase {
                    kind: "pod",
                    phase: pod.status.phase.to_string(),
                })
            }
        }
    }
}
