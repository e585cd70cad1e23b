// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy.

use gw_core::{ObjectKey, ResourceKind};
use thiserror::Error;

/// Errors from store operations.
///
/// NotFound is routinely handled locally ("create it"); Conflict is a
/// transient optimistic-write collision, retried immediately by callers;
/// Forbidden is an authorization denial, surfaced verbatim and never
/// retried.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: ResourceKind, key: ObjectKey },

    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    #[error("conflict writing {kind} {key}: stale resource version")]
    Conflict { kind: ResourceKind, key: ObjectKey },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("store returned {actual} where {expected} was requested: {key}")]
    WrongKind {
        expected: ResourceKind,
        actual: ResourceKind,
        key: ObjectKey,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, StoreError::Forbidden(_))
    }
}
