// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gw-controller: the reconciliation and admission engine.
//!
//! The workspace reconciler drives a workspace's observed infrastructure
//! (pod, volume claim, builtin config, namespace RBAC, state secret) toward
//! desired state through a fixed, short-circuiting chain of status
//! updaters. Run execution is serialized per workspace by a deterministic
//! admission queue recomputed from a snapshot on every pass; privileged
//! commands are additionally gated behind approval annotations. There is no
//! distributed lock anywhere: correctness rests on idempotent side-effect
//! application, optimistic-concurrency status writes, and deterministic
//! recomputation.

pub mod backup;
mod builders;
mod driver;
mod error;
mod events;
pub mod mapping;
mod run;
mod workspace;

#[cfg(test)]
mod test_helpers;

pub use backup::{BackupProvider, LocalDirProvider, ProviderError};
#[cfg(any(test, feature = "test-support"))]
pub use backup::FakeProvider;
pub use driver::{Dispatcher, DispatcherConfig, DispatcherHandle, Reconciler};
pub use error::ReconcileError;
pub use events::{EventRecorder, EventType, TracingRecorder};
#[cfg(any(test, feature = "test-support"))]
pub use events::{RecordedEvent, RecordingRecorder};
pub use run::RunReconciler;
pub use workspace::queue::{compute_queue, position};
pub use workspace::WorkspaceReconciler;
