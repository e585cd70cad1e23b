// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace reconciler: drives a workspace's child infrastructure toward
//! desired state through a fixed, short-circuiting chain of status
//! updaters.

mod approvals;
mod builtins;
mod pod;
pub mod queue;
mod rbac;
mod state;
mod volume;

use crate::backup::BackupProvider;
use crate::driver::Reconciler;
use crate::error::ReconcileError;
use crate::events::{EventRecorder, TracingRecorder};
use crate::mapping;
use async_trait::async_trait;
use gw_core::{
    set_condition, Clock, ObjectKey, SystemClock, Workspace, WorkspaceStatus, CASCADE_FINALIZER,
};
use gw_store::{Store, StoreExt, WatchEvent};
use std::sync::Arc;
use tracing::debug;

/// Upper bound on immediate retries of a conflicted status write. A still
/// contended write after this many attempts falls back to the dispatcher's
/// backoff.
const STATUS_CONFLICT_RETRIES: usize = 5;

/// One updater in the status chain. The chain is a closed set, executed in
/// the order listed on the reconciler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Deletion,
    Queue,
    Builtins,
    Rbac,
    State,
    VolumeClaim,
    Pod,
}

/// The default chain. Deletion first so a deleting workspace short-circuits
/// everything; pod last because it reflects the final observable
/// infrastructure phase.
fn default_chain() -> Vec<Step> {
    vec![
        Step::Deletion,
        Step::Queue,
        Step::Builtins,
        Step::Rbac,
        Step::State,
        Step::VolumeClaim,
        Step::Pod,
    ]
}

/// Reconciles workspaces. Each instance owns an immutable copy of the
/// status chain, so concurrently running reconcilers never share mutable
/// chain state.
pub struct WorkspaceReconciler<C: Clock = SystemClock> {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) backup: Option<Arc<dyn BackupProvider>>,
    pub(crate) recorder: Arc<dyn EventRecorder>,
    pub(crate) clock: C,
    pub(crate) image: String,
    chain: Vec<Step>,
}

impl<C: Clock> WorkspaceReconciler<C> {
    pub fn new(store: Arc<dyn Store>, clock: C, image: impl Into<String>) -> Self {
        Self {
            store,
            backup: None,
            recorder: Arc::new(TracingRecorder),
            clock,
            image: image.into(),
            chain: default_chain(),
        }
    }

    pub fn with_backup_provider(mut self, provider: Arc<dyn BackupProvider>) -> Self {
        self.backup = Some(provider);
        self
    }

    pub fn with_event_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    async fn reconcile_workspace(&self, key: &ObjectKey) -> Result<(), ReconcileError> {
        // Fetch the workspace. Gone means deleted: nothing to do until a
        // new notification arrives.
        let mut ws: Workspace = match self.store.get_as(key).await {
            Ok(ws) => ws,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // Ensure deletion cascades to dependents before doing anything
        // else. The update triggers a fresh watch event, which re-runs the
        // reconcile against the persisted copy.
        if !ws.meta.has_finalizer(CASCADE_FINALIZER) {
            ws.meta.add_finalizer(CASCADE_FINALIZER);
            self.store.update_as(ws).await?;
            return Ok(());
        }

        // Prune approval annotations whose run is gone or completed.
        // Structural comparison: only write when the map actually changed.
        let annotations = self.pruned_approvals(&ws).await?;
        if annotations != ws.meta.annotations {
            ws.meta.annotations = annotations;
            ws = self.store.update_as(ws).await?;
        }

        // Run the chain, then persist status regardless of how far it got:
        // a failed step still leaves conditions worth reporting.
        let chain_result = self.process_chain(&mut ws).await;
        ws.status.phase = ws.derive_phase();
        self.persist_status(key, ws.status).await?;

        chain_result
    }

    /// Call each updater in order. A bail skips the remaining steps; an
    /// error aborts the chain and is returned for backoff.
    async fn process_chain(&self, ws: &mut Workspace) -> Result<(), ReconcileError> {
        for step in &self.chain {
            let bail = match step {
                Step::Deletion => self.handle_deletion(ws),
                Step::Queue => self.manage_queue(ws).await?,
                Step::Builtins => self.manage_builtins(ws).await?,
                Step::Rbac => self.manage_rbac(ws).await?,
                Step::State => self.manage_state(ws).await?,
                Step::VolumeClaim => self.manage_claim(ws).await?,
                Step::Pod => self.manage_pod(ws).await?,
            };
            if bail {
                debug!(step = ?step, workspace = %ws.meta.key(), "chain bailed");
                break;
            }
        }
        Ok(())
    }

    /// A deleting workspace records a Deleting condition and skips every
    /// other step.
    fn handle_deletion(&self, ws: &mut Workspace) -> bool {
        if ws.meta.is_deleting() {
            set_condition(
                &mut ws.status.conditions,
                Workspace::deleting("Workspace is being deleted", self.clock.epoch_ms()),
            );
            return true;
        }
        false
    }

    /// Compute the queue from a fresh snapshot of runs.
    async fn manage_queue(&self, ws: &mut Workspace) -> Result<bool, ReconcileError> {
        let runs: Vec<gw_core::Run> = self.store.list_as(&ws.meta.namespace).await?;
        ws.status.queue = queue::compute_queue(&ws.meta.name, &runs);
        Ok(false)
    }

    /// Persist the status sub-resource via re-fetch-then-write, so a status
    /// write never clobbers a concurrent spec or metadata edit. Write
    /// conflicts are transient: retry immediately against the re-fetched
    /// copy.
    async fn persist_status(
        &self,
        key: &ObjectKey,
        status: WorkspaceStatus,
    ) -> Result<(), ReconcileError> {
        let mut conflict = None;
        for _ in 0..STATUS_CONFLICT_RETRIES {
            let mut latest: Workspace = match self.store.get_as(key).await {
                Ok(ws) => ws,
                // Deleted underneath us; the status no longer matters.
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            latest.status = status.clone();
            match self.store.update_status_as(latest).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() => {
                    conflict = Some(e);
                    continue;
                }
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        match conflict {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<C: Clock> Reconciler for WorkspaceReconciler<C> {
    fn name(&self) -> &'static str {
        "workspace"
    }

    fn map_event(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        mapping::map_to_workspace(event)
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<(), ReconcileError> {
        self.reconcile_workspace(key).await
    }
}

#[cfg(test)]
#[path = "../workspace_tests/mod.rs"]
mod tests;
