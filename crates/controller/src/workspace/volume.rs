// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache volume claim management.

use super::WorkspaceReconciler;
use crate::builders;
use crate::error::ReconcileError;
use gw_core::{
    set_condition, ClaimPhase, Clock, Object, ObjectKey, ResourceKind, VolumeClaim, Workspace,
};
use gw_store::StoreExt;
use tracing::error;

impl<C: Clock> WorkspaceReconciler<C> {
    pub(crate) async fn manage_claim(&self, ws: &mut Workspace) -> Result<bool, ReconcileError> {
        let key = ObjectKey::new(&ws.meta.namespace, ws.claim_name());
        let claim: VolumeClaim = match self.store.get_as(&key).await {
            Ok(claim) => claim,
            Err(e) if e.is_not_found() => {
                let mut claim = builders::cache_claim(ws);
                claim
                    .meta
                    .set_controller_owner(ResourceKind::Workspace, &ws.meta.name);
                self.store.create_as(claim).await?;
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::pending("Creating volume claim", self.clock.epoch_ms()),
                );
                return Ok(false);
            }
            Err(e) => {
                error!(claim = %key, error = %e, "unable to get volume claim");
                return Err(e.into());
            }
        };

        match claim.status.phase {
            ClaimPhase::Bound => Ok(false),
            ClaimPhase::Pending => {
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::pending("Volume claim in pending state", self.clock.epoch_ms()),
                );
                Ok(false)
            }
            ClaimPhase::Lost => {
                // Terminal. The cache volume is gone and nothing here can
                // bring it back.
                self.recorder.warning(
                    &ws.key(),
                    "CacheLost",
                    "Cache persistent volume has been lost",
                );
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::failure(
                        "Volume claim has lost its persistent volume",
                        self.clock.epoch_ms(),
                    ),
                );
                Err(ReconcileError::ClaimLost)
            }
            ClaimPhase::Unknown => {
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::unknown("Volume claim status unknown", self.clock.epoch_ms()),
                );
                // Explicit error so the dispatcher requeues instead of
                // stalling silently on a phase we cannot interpret.
                Err(ReconcileError::UnrecognizedPhase {
                    kind: "volume claim",
                    phase: claim.status.phase.to_string(),
                })
            }
        }
    }
}
