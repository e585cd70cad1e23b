// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State secret management: restore on absence, backup on serial change.

use super::WorkspaceReconciler;
use crate::backup::BackupProvider;
use crate::builders;
use crate::error::ReconcileError;
use gw_core::{
    Clock, Object, ObjectKey, OwnerReference, ResourceKind, Secret, State, Workspace,
};
use gw_store::StoreExt;
use std::sync::Arc;
use tracing::error;

impl<C: Clock> WorkspaceReconciler<C> {
    /// Look up the state secret by its deterministic name. Absent and a
    /// backup provider is configured: attempt a restore. Present: take
    /// ownership, parse it, publish serial/outputs, and back it up when
    /// the serial moved.
    pub(crate) async fn manage_state(&self, ws: &mut Workspace) -> Result<bool, ReconcileError> {
        let key = ObjectKey::new(&ws.meta.namespace, ws.state_secret_name());
        let secret: Secret = match self.store.get_as(&key).await {
            Err(e) if e.is_not_found() => {
                if let Some(provider) = &self.backup {
                    return self.restore(ws, Arc::clone(provider), &key).await;
                }
                // No state yet and nowhere to restore from: first run.
                return Ok(false);
            }
            Err(e) => {
                error!(secret = %key, error = %e, "unable to get state secret");
                return Err(e.into());
            }
            Ok(secret) => secret,
        };

        // Make the workspace owner of the state secret, so that deleting
        // the workspace deletes the state with it.
        let secret = if secret.meta.is_owned_by(ResourceKind::Workspace, &ws.meta.name) {
            secret
        } else {
            let mut secret = secret;
            secret.meta.set_owner(OwnerReference {
                kind: ResourceKind::Workspace,
                name: ws.meta.name.clone(),
                controller: false,
            });
            self.store.update_as(secret).await?
        };

        let state = match State::from_secret(&secret) {
            Ok(state) => state,
            Err(e) => {
                self.recorder
                    .warning(&ws.key(), "StateParseError", &e.to_string());
                return Err(e.into());
            }
        };

        // Report the state serial and outputs in workspace status. Outputs
        // only change when structurally different; the ordered map makes
        // the comparison independent of any iteration order.
        ws.status.serial = Some(state.serial);
        if ws.status.outputs != state.outputs {
            ws.status.outputs = state.outputs;
        }

        // Back up when the parsed serial differs from the recorded backup
        // serial. Strict inequality is the sole trigger, so each distinct
        // serial is backed up at most once.
        if let Some(provider) = &self.backup {
            if !ws.spec.ephemeral && ws.status.backup_serial != Some(state.serial) {
                if let Err(e) = provider.backup(&secret).await {
                    self.recorder
                        .warning(&ws.key(), "BackupError", &e.to_string());
                    return Err(e.into());
                }
                ws.status.backup_serial = Some(state.serial);
                self.recorder.normal(
                    &ws.key(),
                    "BackupSuccessful",
                    &format!("Backed up state #{}", state.serial),
                );
            }
        }

        Ok(false)
    }

    /// Restore the state secret from backup. No backup found is not an
    /// error; the workspace simply has no state yet.
    async fn restore(
        &self,
        ws: &mut Workspace,
        provider: Arc<dyn BackupProvider>,
        key: &ObjectKey,
    ) -> Result<bool, ReconcileError> {
        let secret = match provider.restore(key).await {
            Err(e) => {
                self.recorder
                    .warning(&ws.key(), "RestoreError", &e.to_string());
                return Err(e.into());
            }
            Ok(None) => {
                self.recorder
                    .normal(&ws.key(), "RestoreSkipped", "There is no state to restore");
                return Ok(false);
            }
            Ok(Some(secret)) => secret,
        };

        // Rebuild metadata from scratch: stale resource versions and
        // ownership from the backed-up copy would be rejected on create.
        let secret = builders::state_secret(ws, secret.data);
        let secret = self.store.create_as(secret).await?;

        let state = match State::from_secret(&secret) {
            Ok(state) => state,
            Err(e) => {
                self.recorder
                    .warning(&ws.key(), "RestoreError", &e.to_string());
                return Err(e.into());
            }
        };

        // The restored serial counts as both last seen and last backed up.
        ws.status.serial = Some(state.serial);
        ws.status.backup_serial = Some(state.serial);
        self.recorder.normal(
            &ws.key(),
            "RestoreSuccessful",
            &format!("Restored state #{}", state.serial),
        );

        Ok(false)
    }
}
