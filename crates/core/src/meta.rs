// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object identity and metadata shared by every resource kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Finalizer that switches deletion to foreground cascading: the store keeps
/// a deleting object around (with its deletion timestamp set) until its
/// dependents are gone.
pub const CASCADE_FINALIZER: &str = "groundwork.dev/cascade-delete";

/// The closed set of resource kinds the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Workspace,
    Run,
    Pod,
    VolumeClaim,
    ConfigMap,
    Secret,
    ServiceAccount,
    Role,
    RoleBinding,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "workspace",
            ResourceKind::Run => "run",
            ResourceKind::Pod => "pod",
            ResourceKind::VolumeClaim => "volumeclaim",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Secret => "secret",
            ResourceKind::ServiceAccount => "serviceaccount",
            ResourceKind::Role => "role",
            ResourceKind::RoleBinding => "rolebinding",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Namespaced address of an object within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reference from a child object to the owner whose lifecycle governs it.
///
/// A controller owner marks the child for cascading deletion when the owner
/// goes away; a non-controller reference only records the relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub kind: ResourceKind,
    pub name: String,
    pub controller: bool,
}

/// Metadata common to all resource kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Opaque write fence, bumped by the store on every persisted change.
    /// Writes carrying a stale version are rejected with a conflict.
    #[serde(default)]
    pub resource_version: u64,
    /// Stamped by the store on create.
    #[serde(default)]
    pub creation_epoch_ms: u64,
    /// Set when deletion has been requested but finalizers are pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_epoch_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// Deletion has been requested for this object.
    pub fn is_deleting(&self) -> bool {
        self.deletion_epoch_ms.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    /// Add a finalizer if not already present.
    pub fn add_finalizer(&mut self, finalizer: &str) {
        if !self.has_finalizer(finalizer) {
            self.finalizers.push(finalizer.to_string());
        }
    }

    /// The owner reference marked as controller, if any.
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }

    pub fn is_owned_by(&self, kind: ResourceKind, name: &str) -> bool {
        self.owner_references
            .iter()
            .any(|r| r.kind == kind && r.name == name)
    }

    /// Record an owner reference, replacing any existing reference to the
    /// same owner.
    pub fn set_owner(&mut self, owner: OwnerReference) {
        self.owner_references
            .retain(|r| !(r.kind == owner.kind && r.name == owner.name));
        self.owner_references.push(owner);
    }

    /// Record `owner` as the controller of this object.
    pub fn set_controller_owner(&mut self, kind: ResourceKind, name: impl Into<String>) {
        self.set_owner(OwnerReference {
            kind,
            name: name.into(),
            controller: true,
        });
    }
}

/// Implemented by every typed resource.
pub trait Object: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }
}

/// Implement [`Object`] for a resource struct with a `meta` field.
#[macro_export]
macro_rules! impl_object {
    ($ty:ty, $kind:ident) => {
        impl $crate::meta::Object for $ty {
            const KIND: $crate::meta::ResourceKind = $crate::meta::ResourceKind::$kind;

            fn meta(&self) -> &$crate::meta::ObjectMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut $crate::meta::ObjectMeta {
                &mut self.meta
            }
        }
    };
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
