// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin config management.

use super::WorkspaceReconciler;
use crate::builders;
use crate::error::ReconcileError;
use gw_core::{set_condition, Clock, ConfigMap, ObjectKey, ResourceKind, Workspace};
use gw_store::StoreExt;
use tracing::error;

impl<C: Clock> WorkspaceReconciler<C> {
    /// Create the builtin config if absent. The config is generated once;
    /// drift is not reconciled.
    pub(crate) async fn manage_builtins(&self, ws: &mut Workspace) -> Result<bool, ReconcileError> {
        let key = ObjectKey::new(&ws.meta.namespace, ws.builtins_config_name());
        match self.store.get_as::<ConfigMap>(&key).await {
            Ok(_) => Ok(false),
            Err(e) if e.is_not_found() => {
                let mut config = builders::builtins_config(ws);
                config
                    .meta
                    .set_controller_owner(ResourceKind::Workspace, &ws.meta.name);
                self.store.create_as(config).await?;
                set_condition(
                    &mut ws.status.conditions,
                    Workspace::pending("Creating builtins config", self.clock.epoch_ms()),
                );
                Ok(false)
            }
            Err(e) => {
                error!(config = %key, error = %e, "unable to get builtins config");
                Err(e.into())
            }
        }
    }
}
