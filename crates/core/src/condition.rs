// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed status conditions with upsert semantics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition types recorded on a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    /// Overall readiness of the workspace's infrastructure.
    Ready,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionType::Ready => write!(f, "Ready"),
        }
    }
}

/// Boolean-ish condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Machine-readable reason for a condition's status. Closed set; the
/// workspace phase is a pure function of the Ready condition's reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionReason {
    Ready,
    Deleting,
    Failure,
    Pending,
    Unknown,
}

impl fmt::Display for ConditionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionReason::Ready => write!(f, "Ready"),
            ConditionReason::Deleting => write!(f, "Deleting"),
            ConditionReason::Failure => write!(f, "Failure"),
            ConditionReason::Pending => write!(f, "Pending"),
            ConditionReason::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Timestamped health signal with a machine reason and a human message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    pub reason: ConditionReason,
    pub message: String,
    pub last_transition_ms: u64,
}

/// Upsert `new` into `conditions`: replace an existing entry of the same
/// type, else append. The transition timestamp is preserved when the status
/// is unchanged, so repeated reconciles of an unchanged resource do not
/// churn timestamps. Conditions are never removed.
pub fn set_condition(conditions: &mut Vec<Condition>, new: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == new.type_) {
        Some(existing) => {
            if existing.status == new.status {
                existing.reason = new.reason;
                existing.message = new.message;
            } else {
                *existing = new;
            }
        }
        None => conditions.push(new),
    }
}

/// Find the condition of the given type.
pub fn find_condition(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
