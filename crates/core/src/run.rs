// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run resource: one command invocation against a workspace.

use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Desired state of a run. Created by an external launcher or the
/// GitHub-event handler; the controllers only observe it and mirror its
/// pod's phase into the status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Workspace this run executes against.
    pub workspace: String,
    /// Command to execute, e.g. "plan" or "apply".
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Config holding the archived module files, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<String>,
    /// Whether the launcher intends to attach to the pod's TTY.
    #[serde(default)]
    pub attach: bool,
}

/// Phase of a run's lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    #[default]
    Pending,
    /// Waiting behind other runs, or waiting for approval.
    Queued,
    Running,
    Completed,
    /// Pod failed or was lost. Terminal.
    Error,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Error)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Pending => write!(f, "pending"),
            RunPhase::Queued => write!(f, "queued"),
            RunPhase::Running => write!(f, "running"),
            RunPhase::Completed => write!(f, "completed"),
            RunPhase::Error => write!(f, "error"),
        }
    }
}

/// One recorded phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTransition {
    pub phase: RunPhase,
    pub at_ms: u64,
}

/// Observed state of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default)]
    pub phase: RunPhase,
    /// Phase history, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<RunTransition>,
}

impl RunStatus {
    /// Record a phase change, appending to the transition history. A no-op
    /// when the phase is unchanged, so repeated reconciles do not grow the
    /// history.
    pub fn record_phase(&mut self, phase: RunPhase, epoch_ms: u64) {
        if self.phase == phase && !self.transitions.is_empty() {
            return;
        }
        self.phase = phase;
        self.transitions.push(RunTransition { phase, at_ms: epoch_ms });
    }
}

/// One command invocation against a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub meta: ObjectMeta,
    pub spec: RunSpec,
    #[serde(default)]
    pub status: RunStatus,
}

crate::impl_object!(Run, Run);

impl Run {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, workspace: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: RunSpec {
                workspace: workspace.into(),
                command: command.into(),
                ..RunSpec::default()
            },
            status: RunStatus::default(),
        }
    }

    /// Completed and Error runs are never reconciled or queued again.
    pub fn is_terminal(&self) -> bool {
        self.status.phase.is_terminal()
    }

    /// Name of the run's pod.
    pub fn pod_name(&self) -> String {
        self.meta.name.clone()
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
