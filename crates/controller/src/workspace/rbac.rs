// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace RBAC management.
//!
//! The ServiceAccount/Role/RoleBinding triple is shared by every run pod
//! in the namespace, so none of it carries an owner reference and it must
//! outlive any single workspace.

use super::WorkspaceReconciler;
use crate::builders;
use crate::error::ReconcileError;
use gw_core::{
    Clock, ObjectKey, Role, RoleBinding, ServiceAccount, Workspace, ROLE_BINDING_NAME, ROLE_NAME,
    SERVICE_ACCOUNT_NAME,
};
use gw_store::StoreExt;
use tracing::error;

impl<C: Clock> WorkspaceReconciler<C> {
    pub(crate) async fn manage_rbac(&self, ws: &mut Workspace) -> Result<bool, ReconcileError> {
        let namespace = &ws.meta.namespace;

        // The service account is created only if absent and never updated
        // thereafter: users add annotations to it to enable identity
        // federation, and an update would overwrite them.
        let sa_key = ObjectKey::new(namespace, SERVICE_ACCOUNT_NAME);
        match self.store.get_as::<ServiceAccount>(&sa_key).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                self.store
                    .create_as(builders::service_account(namespace))
                    .await?;
            }
            Err(e) => {
                error!(service_account = %sa_key, error = %e, "unable to get service account");
                return Err(e.into());
            }
        }

        // Role and RoleBinding are fully owned: reconcile them to desired
        // state on every pass.
        let role_key = ObjectKey::new(namespace, ROLE_NAME);
        match self.store.get_as::<Role>(&role_key).await {
            Ok(existing) => {
                let mut desired = builders::role(namespace);
                let changed = desired.rules != existing.rules;
                desired.meta = existing.meta;
                // Skip the write when already at desired state; it would
                // only churn resource versions and watch events.
                if changed {
                    self.store.update_as(desired).await?;
                }
            }
            Err(e) if e.is_not_found() => {
                self.store.create_as(builders::role(namespace)).await?;
            }
            Err(e) => return Err(e.into()),
        }

        let binding_key = ObjectKey::new(namespace, ROLE_BINDING_NAME);
        match self.store.get_as::<RoleBinding>(&binding_key).await {
            Ok(existing) => {
                let mut desired = builders::role_binding(namespace);
                let changed = desired.role != existing.role || desired.subjects != existing.subjects;
                desired.meta = existing.meta;
                if changed {
                    self.store.update_as(desired).await?;
                }
            }
            Err(e) if e.is_not_found() => {
                self.store
                    .create_as(builders::role_binding(namespace))
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(false)
    }
}
