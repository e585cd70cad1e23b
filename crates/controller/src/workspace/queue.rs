// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic run admission order.
//!
//! The queue is recomputed from scratch on every reconcile: it is a pure
//! function of a snapshot of runs, so any replica computing it from the
//! same snapshot reaches the same order without coordination. That
//! determinism is what stands in for a distributed lock; the underlying
//! tool does not tolerate concurrent writers to its state.

use gw_core::Run;

/// Execution order for a workspace's runs: every non-terminal run
/// referencing the workspace, ascending by creation time, ties broken by
/// name. Position 0 is admitted; the rest wait. Terminal runs are excluded
/// but retained in the store for history.
pub fn compute_queue(workspace: &str, runs: &[Run]) -> Vec<String> {
    let mut queued: Vec<&Run> = runs
        .iter()
        .filter(|run| run.spec.workspace == workspace && !run.is_terminal())
        .collect();
    queued.sort_by(|a, b| {
        a.meta
            .creation_epoch_ms
            .cmp(&b.meta.creation_epoch_ms)
            .then_with(|| a.meta.name.cmp(&b.meta.name))
    });
    queued.iter().map(|run| run.meta.name.clone()).collect()
}

/// Position of a run in the queue, if present.
pub fn position(queue: &[String], run_name: &str) -> Option<usize> {
    queue.iter().position(|name| name == run_name)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
