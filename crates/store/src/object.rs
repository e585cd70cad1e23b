// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed variant over every storable resource kind.

use crate::error::StoreError;
use gw_core::{
    ConfigMap, Object, ObjectKey, ObjectMeta, Pod, ResourceKind, Role, RoleBinding, Run, Secret,
    ServiceAccount, VolumeClaim, Workspace,
};
use serde::{Deserialize, Serialize};

/// A typed resource that can be lifted into and out of [`AnyObject`].
pub trait ObjectVariant: Object {
    fn from_any(object: AnyObject) -> Result<Self, StoreError>;
    fn into_any(self) -> AnyObject;
}

macro_rules! any_object {
    ($( $kind:ident => $ty:ty ),* $(,)?) => {
        /// One object of any storable kind.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind")]
        pub enum AnyObject {
            $( $kind($ty), )*
        }

        impl AnyObject {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $( AnyObject::$kind(_) => ResourceKind::$kind, )*
                }
            }

            pub fn meta(&self) -> &ObjectMeta {
                match self {
                    $( AnyObject::$kind(o) => &o.meta, )*
                }
            }

            pub fn meta_mut(&mut self) -> &mut ObjectMeta {
                match self {
                    $( AnyObject::$kind(o) => &mut o.meta, )*
                }
            }

            pub fn key(&self) -> ObjectKey {
                self.meta().key()
            }
        }

        $(
            impl From<$ty> for AnyObject {
                fn from(object: $ty) -> Self {
                    AnyObject::$kind(object)
                }
            }

            impl ObjectVariant for $ty {
                fn from_any(object: AnyObject) -> Result<Self, StoreError> {
                    match object {
                        AnyObject::$kind(o) => Ok(o),
                        other => Err(StoreError::WrongKind {
                            expected: ResourceKind::$kind,
                            actual: other.kind(),
                            key: other.key(),
                        }),
                    }
                }

                fn into_any(self) -> AnyObject {
                    AnyObject::$kind(self)
                }
            }
        )*
    };
}

any_object! {
    Workspace => Workspace,
    Run => Run,
    Pod => Pod,
    VolumeClaim => VolumeClaim,
    ConfigMap => ConfigMap,
    Secret => Secret,
    ServiceAccount => ServiceAccount,
    Role => Role,
    RoleBinding => RoleBinding,
}

impl AnyObject {
    /// Copy the status sub-resource from `from` into `self`. Kinds without
    /// a status are left untouched, as are mismatched kinds (callers guard
    /// kinds before merging).
    pub(crate) fn adopt_status(&mut self, from: &AnyObject) {
        match (self, from) {
            (AnyObject::Workspace(a), AnyObject::Workspace(b)) => a.status = b.status.clone(),
            (AnyObject::Run(a), AnyObject::Run(b)) => a.status = b.status.clone(),
            (AnyObject::Pod(a), AnyObject::Pod(b)) => a.status = b.status.clone(),
            (AnyObject::VolumeClaim(a), AnyObject::VolumeClaim(b)) => a.status = b.status.clone(),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
