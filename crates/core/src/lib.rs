// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gw-core: resource model for the Groundwork orchestrator.
//!
//! Defines the declarative resources the controllers drive (Workspace, Run,
//! and their child infrastructure), status conditions, deterministic child
//! names, and the state-file parser. Contains no I/O; everything here is a
//! pure function of its inputs so that any replica computing from the same
//! snapshot reaches the same result.

pub mod clock;
pub mod condition;
pub mod meta;
pub mod resources;
pub mod run;
pub mod state;
pub mod workspace;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use condition::{
    find_condition, set_condition, Condition, ConditionReason, ConditionStatus, ConditionType,
};
pub use meta::{Object, ObjectKey, ObjectMeta, OwnerReference, ResourceKind, CASCADE_FINALIZER};
pub use resources::{
    ClaimPhase, ClaimSpec, ClaimStatus, ConfigMap, Container, EnvVar, Pod, PodPhase, PodSpec,
    PodStatus, PolicyRule, Role, RoleBinding, Secret, ServiceAccount, Subject, Volume, VolumeClaim,
    VolumeMount, VolumeSource,
};
pub use run::{Run, RunPhase, RunSpec, RunStatus, RunTransition};
pub use state::{State, StateParseError, STATE_DATA_KEY};
pub use workspace::{
    AttachSpec, CacheSpec, Workspace, WorkspacePhase, WorkspaceSpec, WorkspaceStatus,
    APPROVAL_ANNOTATION_PREFIX, ROLE_BINDING_NAME, ROLE_NAME, SERVICE_ACCOUNT_NAME,
    WORKSPACE_LABEL,
};
