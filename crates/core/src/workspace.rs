// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace resource: a persistent working directory bound to durable
//! state and a cache volume.

use crate::condition::{
    find_condition, Condition, ConditionReason, ConditionStatus, ConditionType,
};
use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name given to the ServiceAccount created in each namespace. Only one is
/// created in any given namespace; every run pod in the namespace uses it.
pub const SERVICE_ACCOUNT_NAME: &str = "groundwork";
/// Name given to the Role created in each namespace.
pub const ROLE_NAME: &str = "groundwork";
/// Name given to the RoleBinding created in each namespace.
pub const ROLE_BINDING_NAME: &str = "groundwork";

/// Prefix of approval annotations. The full key is the prefix followed by
/// the run name; presence of the key is the sole admission signal for
/// privileged commands.
pub const APPROVAL_ANNOTATION_PREFIX: &str = "approved.groundwork.dev/";

/// Label placed on state secrets; the value names the owning workspace so
/// secret events can be mapped back to it without a store lookup.
pub const WORKSPACE_LABEL: &str = "groundwork.dev/workspace";

/// Desired state of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSpec {
    /// Directory, relative to the module root, commands execute in.
    #[serde(default)]
    pub working_dir: String,
    /// Commands that require an approval annotation before their run's pod
    /// may be created.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub privileged_commands: Vec<String>,
    /// Service account run pods execute under.
    #[serde(default = "default_service_account")]
    pub service_account: String,
    /// Credentials secret mounted into pods, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    /// Ephemeral workspaces never trigger state backups.
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub cache: CacheSpec,
    #[serde(default)]
    pub attach: AttachSpec,
}

impl Default for WorkspaceSpec {
    fn default() -> Self {
        Self {
            working_dir: String::new(),
            privileged_commands: Vec::new(),
            service_account: default_service_account(),
            secret_name: None,
            ephemeral: false,
            cache: CacheSpec::default(),
            attach: AttachSpec::default(),
        }
    }
}

fn default_service_account() -> String {
    SERVICE_ACCOUNT_NAME.to_string()
}

/// Cache volume claim parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    pub size: String,
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self {
            storage_class: None,
            size: "1Gi".to_string(),
        }
    }
}

/// Client attach handshake settings, passed through to pod environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachSpec {
    #[serde(default)]
    pub handshake: bool,
    pub handshake_timeout: String,
}

impl Default for AttachSpec {
    fn default() -> Self {
        Self {
            handshake: false,
            handshake_timeout: "10s".to_string(),
        }
    }
}

/// Observed state of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub phase: WorkspacePhase,
    /// Serial of the most recently observed state file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<u64>,
    /// Serial of the most recently backed-up state file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_serial: Option<u64>,
    /// Output values parsed from the state file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,
    /// Names of non-terminal runs, in execution order. Position 0 is
    /// admitted; the rest wait.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queue: Vec<String>,
}

/// Phase derived from the Ready condition's reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspacePhase {
    Initializing,
    Ready,
    Error,
    Deleting,
    #[default]
    Unknown,
}

impl fmt::Display for WorkspacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspacePhase::Initializing => write!(f, "initializing"),
            WorkspacePhase::Ready => write!(f, "ready"),
            WorkspacePhase::Error => write!(f, "error"),
            WorkspacePhase::Deleting => write!(f, "deleting"),
            WorkspacePhase::Unknown => write!(f, "unknown"),
        }
    }
}

/// A persistent working directory bound to durable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub meta: ObjectMeta,
    pub spec: WorkspaceSpec,
    #[serde(default)]
    pub status: WorkspaceStatus,
}

crate::impl_object!(Workspace, Workspace);

impl Workspace {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: WorkspaceSpec::default(),
            status: WorkspaceStatus::default(),
        }
    }

    /// Name of the workspace's pod.
    pub fn pod_name(&self) -> String {
        format!("workspace-{}", self.meta.name)
    }

    /// Name of the workspace's cache volume claim.
    pub fn claim_name(&self) -> String {
        format!("workspace-{}", self.meta.name)
    }

    /// Name of the generated config holding builtin configuration.
    pub fn builtins_config_name(&self) -> String {
        format!("workspace-builtins-{}", self.meta.name)
    }

    /// Name of the state secret. Derived from workspace identity so any
    /// replica looks up the same secret without coordination.
    pub fn state_secret_name(&self) -> String {
        format!("state-{}-{}", self.meta.namespace, self.meta.name)
    }

    /// Fully qualified backend workspace name, namespacing state per
    /// workspace within a shared backend.
    pub fn backend_workspace(&self) -> String {
        format!("{}-{}", self.meta.namespace, self.meta.name)
    }

    pub fn is_privileged(&self, command: &str) -> bool {
        self.spec.privileged_commands.iter().any(|c| c == command)
    }

    /// Annotation key whose presence approves the named run.
    pub fn approval_annotation_key(run_name: &str) -> String {
        format!("{}{}", APPROVAL_ANNOTATION_PREFIX, run_name)
    }

    /// The run name an approval annotation key refers to, if it is one.
    pub fn run_name_from_approval_key(key: &str) -> Option<&str> {
        key.strip_prefix(APPROVAL_ANNOTATION_PREFIX)
    }

    pub fn is_approved(&self, run_name: &str) -> bool {
        self.meta
            .annotations
            .contains_key(&Self::approval_annotation_key(run_name))
    }

    pub fn ready_condition(&self) -> Option<&Condition> {
        find_condition(&self.status.conditions, ConditionType::Ready)
    }

    /// Map the Ready condition's reason to a phase. Pure function of the
    /// conditions: no condition yet means Unknown.
    pub fn derive_phase(&self) -> WorkspacePhase {
        match self.ready_condition().map(|c| c.reason) {
            Some(ConditionReason::Ready) => WorkspacePhase::Ready,
            Some(ConditionReason::Deleting) => WorkspacePhase::Deleting,
            Some(ConditionReason::Failure) => WorkspacePhase::Error,
            Some(ConditionReason::Pending) => WorkspacePhase::Initializing,
            Some(ConditionReason::Unknown) | None => WorkspacePhase::Unknown,
        }
    }
}

/// Ready condition helpers mirroring the closed reason set.
impl Workspace {
    pub fn ready(message: impl Into<String>, epoch_ms: u64) -> Condition {
        Condition {
            type_: ConditionType::Ready,
            status: ConditionStatus::True,
            reason: ConditionReason::Ready,
            message: message.into(),
            last_transition_ms: epoch_ms,
        }
    }

    pub fn pending(message: impl Into<String>, epoch_ms: u64) -> Condition {
        Condition {
            type_: ConditionType::Ready,
            status: ConditionStatus::False,
            reason: ConditionReason::Pending,
            message: message.into(),
            last_transition_ms: epoch_ms,
        }
    }

    pub fn failure(message: impl Into<String>, epoch_ms: u64) -> Condition {
        Condition {
            type_: ConditionType::Ready,
            status: ConditionStatus::False,
            reason: ConditionReason::Failure,
            message: message.into(),
            last_transition_ms: epoch_ms,
        }
    }

    pub fn deleting(message: impl Into<String>, epoch_ms: u64) -> Condition {
        Condition {
            type_: ConditionType::Ready,
            status: ConditionStatus::False,
            reason: ConditionReason::Deleting,
            message: message.into(),
            last_transition_ms: epoch_ms,
        }
    }

    pub fn unknown(message: impl Into<String>, epoch_ms: u64) -> Condition {
        Condition {
            type_: ConditionType::Ready,
            status: ConditionStatus::Unknown,
            reason: ConditionReason::Unknown,
            message: message.into(),
            last_transition_ms: epoch_ms,
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
