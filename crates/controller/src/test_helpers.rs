// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the controller crate.

use crate::backup::FakeProvider;
use crate::events::RecordingRecorder;
use crate::run::RunReconciler;
use crate::workspace::WorkspaceReconciler;
use gw_core::{
    ClaimPhase, FakeClock, Object, ObjectKey, Pod, PodPhase, Run, Secret, VolumeClaim, Workspace,
};
use gw_store::{MemoryStore, Store, StoreExt};
use std::sync::Arc;

pub(crate) const TEST_IMAGE: &str = "groundwork/runner:test";

/// Test context wiring reconcilers to an in-process store with fakes.
pub(crate) struct TestContext {
    pub store: MemoryStore<FakeClock>,
    pub clock: FakeClock,
    pub provider: FakeProvider,
    pub recorder: RecordingRecorder,
    pub workspaces: WorkspaceReconciler<FakeClock>,
    pub runs: RunReconciler<FakeClock>,
}

/// Context with a backup provider configured.
pub(crate) fn setup() -> TestContext {
    setup_inner(true)
}

/// Context without a backup provider (restore/backup never attempted).
pub(crate) fn setup_without_backup() -> TestContext {
    setup_inner(false)
}

fn setup_inner(with_backup: bool) -> TestContext {
    let clock = FakeClock::new();
    let store = MemoryStore::new(clock.clone());
    let arc_store: Arc<dyn Store> = Arc::new(store.clone());
    let provider = FakeProvider::new();
    let recorder = RecordingRecorder::new();

    let mut workspaces = WorkspaceReconciler::new(Arc::clone(&arc_store), clock.clone(), TEST_IMAGE)
        .with_event_recorder(Arc::new(recorder.clone()));
    if with_backup {
        workspaces = workspaces.with_backup_provider(Arc::new(provider.clone()));
    }

    let runs = RunReconciler::new(Arc::clone(&arc_store), clock.clone(), TEST_IMAGE);

    TestContext {
        store,
        clock,
        provider,
        recorder,
        workspaces,
        runs,
    }
}

impl TestContext {
    pub async fn create_workspace(&self, name: &str) -> Workspace {
        self.store
            .create_as(Workspace::new("default", name))
            .await
            .unwrap()
    }

    /// Create a run, advancing the fake clock first so creation timestamps
    /// are strictly ordered.
    pub async fn create_run(&self, name: &str, workspace: &str, command: &str) -> Run {
        self.clock.advance_ms(10);
        self.store
            .create_as(Run::new("default", name, workspace, command))
            .await
            .unwrap()
    }

    pub async fn get_workspace(&self, name: &str) -> Workspace {
        self.store
            .get_as(&ObjectKey::new("default", name))
            .await
            .unwrap()
    }

    pub async fn get_run(&self, name: &str) -> Run {
        self.store
            .get_as(&ObjectKey::new("default", name))
            .await
            .unwrap()
    }

    /// One reconcile pass over a workspace.
    pub async fn reconcile_workspace(
        &self,
        name: &str,
    ) -> Result<(), crate::error::ReconcileError> {
        use crate::driver::Reconciler;
        self.workspaces
            .reconcile(&ObjectKey::new("default", name))
            .await
    }

    /// Two passes: the first adds the cascade finalizer and returns.
    pub async fn settle_workspace(&self, name: &str) -> Result<(), crate::error::ReconcileError> {
        self.reconcile_workspace(name).await?;
        self.reconcile_workspace(name).await
    }

    pub async fn reconcile_run(&self, name: &str) -> Result<(), crate::error::ReconcileError> {
        use crate::driver::Reconciler;
        self.runs.reconcile(&ObjectKey::new("default", name)).await
    }

    pub async fn set_pod_phase(&self, pod_name: &str, phase: PodPhase) {
        let mut pod: Pod = self
            .store
            .get_as(&ObjectKey::new("default", pod_name))
            .await
            .unwrap();
        pod.status.phase = phase;
        self.store.update_status_as(pod).await.unwrap();
    }

    pub async fn set_claim_phase(&self, claim_name: &str, phase: ClaimPhase) {
        let mut claim: VolumeClaim = self
            .store
            .get_as(&ObjectKey::new("default", claim_name))
            .await
            .unwrap();
        claim.status.phase = phase;
        self.store.update_status_as(claim).await.unwrap();
    }

    /// Drive a fresh workspace to Ready: settle, bind the claim, run the
    /// pod, reconcile again.
    pub async fn make_ready(&self, name: &str) -> Workspace {
        self.settle_workspace(name).await.unwrap();
        let ws = self.get_workspace(name).await;
        self.set_claim_phase(&ws.claim_name(), ClaimPhase::Bound).await;
        self.set_pod_phase(&ws.pod_name(), PodPhase::Running).await;
        self.reconcile_workspace(name).await.unwrap();
        self.get_workspace(name).await
    }

    /// Store a state secret for the workspace with the given serial.
    pub async fn put_state_secret(&self, ws: &Workspace, serial: u64) -> Secret {
        let secret = state_secret(ws, serial);
        match self.store.get_as::<Secret>(&secret.key()).await {
            Ok(mut existing) => {
                existing.data = secret.data;
                self.store.update_as(existing).await.unwrap()
            }
            Err(_) => self.store.create_as(secret).await.unwrap(),
        }
    }
}

/// A state secret carrying a minimal valid payload.
pub(crate) fn state_secret(ws: &Workspace, serial: u64) -> Secret {
    let payload = format!(
        r#"{{"version": 4, "serial": {}, "outputs": {{"ip": {{"value": "10.0.0.1", "type": "string"}}}}}}"#,
        serial
    );
    let mut data = std::collections::BTreeMap::new();
    data.insert(gw_core::STATE_DATA_KEY.to_string(), payload.into_bytes());
    crate::builders::state_secret(ws, data)
}
