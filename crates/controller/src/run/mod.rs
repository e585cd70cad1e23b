// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run reconciler: creates the runner pod for the admitted run and mirrors
//! the pod's phase into the run's status.
//!
//! Admission consults the workspace's queue (position 0 only) and, for
//! privileged commands, the approval annotation. Order, fairness, and
//! single-writer semantics are already encoded in the queue the
//! workspace reconciler computes.

use crate::builders;
use crate::driver::Reconciler;
use crate::error::ReconcileError;
use crate::mapping;
use crate::workspace::queue::position;
use async_trait::async_trait;
use gw_core::{Clock, ObjectKey, Pod, PodPhase, Run, RunPhase, RunStatus, SystemClock, Workspace};
use gw_store::{Store, StoreExt, WatchEvent};
use std::sync::Arc;
use tracing::{debug, error};

/// Same bound as the workspace reconciler's status writes.
const STATUS_CONFLICT_RETRIES: usize = 5;

/// Reconciles runs.
pub struct RunReconciler<C: Clock = SystemClock> {
    store: Arc<dyn Store>,
    clock: C,
    image: String,
}

impl<C: Clock> RunReconciler<C> {
    pub fn new(store: Arc<dyn Store>, clock: C, image: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            image: image.into(),
        }
    }

    async fn reconcile_run(&self, key: &ObjectKey) -> Result<(), ReconcileError> {
        let run: Run = match self.store.get_as(key).await {
            Ok(run) => run,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // Terminal runs are history; never touch them again.
        if run.is_terminal() {
            return Ok(());
        }

        let ws_key = ObjectKey::new(&run.meta.namespace, &run.spec.workspace);
        let ws: Workspace = match self.store.get_as(&ws_key).await {
            Ok(ws) => ws,
            // No workspace yet. Stay pending; its arrival re-triggers us.
            Err(e) if e.is_not_found() => {
                return self.persist_phase(&run, RunPhase::Pending).await;
            }
            Err(e) => return Err(e.into()),
        };

        let phase = match position(&ws.status.queue, &run.meta.name) {
            // Not admitted into the queue yet (the workspace reconciler
            // recomputes it on every pass).
            None => RunPhase::Pending,
            Some(0) => self.admit(&run, &ws).await?,
            Some(_) => RunPhase::Queued,
        };

        self.persist_phase(&run, phase).await
    }

    /// The run holds queue position 0. Gate privileged commands on the
    /// approval annotation, then ensure the runner pod exists and mirror
    /// its phase.
    async fn admit(&self, run: &Run, ws: &Workspace) -> Result<RunPhase, ReconcileError> {
        if ws.is_privileged(&run.spec.command) && !ws.is_approved(&run.meta.name) {
            debug!(run = %run.meta.key(), command = %run.spec.command, "awaiting approval");
            return Ok(RunPhase::Queued);
        }

        let pod_key = ObjectKey::new(&run.meta.namespace, run.pod_name());
        let pod: Pod = match self.store.get_as(&pod_key).await {
            Ok(pod) => pod,
            Err(e) if e.is_not_found() => {
                let pod = builders::run_pod(run, ws, &self.image);
                self.store.create_as(pod).await?;
                return Ok(RunPhase::Pending);
            }
            Err(e) => {
                error!(pod = %pod_key, error = %e, "unable to get run pod");
                return Err(e.into());
            }
        };

        match pod.status.phase {
            PodPhase::Pending => Ok(RunPhase::Pending),
            PodPhase::Running => Ok(RunPhase::Running),
            PodPhase::Succeeded => Ok(RunPhase::Completed),
            PodPhase::Failed => Ok(RunPhase::Error),
            PodPhase::Unknown => Err(ReconcileError::UnrecognizedPhase {
                kind: "pod",
                phase: pod.status.phase.to_string(),
            }),
        }
    }

    /// Persist the run's phase via re-fetch-then-write, retrying conflicts
    /// immediately. No write when the phase is unchanged.
    async fn persist_phase(&self, run: &Run, phase: RunPhase) -> Result<(), ReconcileError> {
        if run.status.phase == phase && !run.status.transitions.is_empty() {
            return Ok(());
        }

        let key = run.meta.key();
        let mut conflict = None;
        for _ in 0..STATUS_CONFLICT_RETRIES {
            let mut latest: Run = match self.store.get_as(&key).await {
                Ok(run) => run,
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let mut status: RunStatus = latest.status.clone();
            status.record_phase(phase, self.clock.epoch_ms());
            latest.status = status;
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
impl<C: Clock> Reconciler for RunReconciler<C> {
    fn name(&self) -> &'static str {
        "run"
    }

    fn map_event(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        mapping::map_to_run(event)
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<(), ReconcileError> {
        self.reconcile_run(key).await
    }
}

#[cfg(test)]
#[path = "../run_tests.rs"]
mod tests;
