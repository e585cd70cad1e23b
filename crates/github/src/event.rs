// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incoming webhook events as a closed tagged variant.
//!
//! The transport layer hands over a raw event kind and JSON payload; a
//! lookup table keyed by kind turns the finite set of interesting events
//! into [`WebhookEvent`] values. Unhandled kinds are ignored, not errors.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed {kind} payload: missing {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

/// The finite set of events the run-deriving path handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckSuite {
        action: String,
        owner: String,
        repo: String,
        branch: String,
        sha: String,
    },
    CheckRun {
        action: String,
        /// User-requested action on the check (e.g. "apply").
        requested_action: Option<String>,
        owner: String,
        repo: String,
        branch: String,
        sha: String,
    },
    PullRequest {
        action: String,
        owner: String,
        repo: String,
        branch: String,
        sha: String,
    },
}

type Parser = fn(&Value) -> Result<WebhookEvent, EventError>;

/// Dispatch table keyed by event kind.
const PARSERS: &[(&str, Parser)] = &[
    ("check_suite", parse_check_suite),
    ("check_run", parse_check_run),
    ("pull_request", parse_pull_request),
];

/// Parse one incoming event. `Ok(None)` means the kind is not one this
/// path handles.
pub fn parse_event(kind: &str, payload: &Value) -> Result<Option<WebhookEvent>, EventError> {
    match PARSERS.iter().find(|(k, _)| *k == kind) {
        Some((_, parse)) => parse(payload).map(Some),
        None => Ok(None),
    }
}

fn field<'a>(
    payload: &'a Value,
    kind: &'static str,
    pointer: &'static str,
) -> Result<&'a str, EventError> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or(EventError::MissingField {
            kind,
            field: pointer,
        })
}

fn parse_check_suite(payload: &Value) -> Result<WebhookEvent, EventError> {
    const KIND: &str = "check_suite";
    Ok(WebhookEvent::CheckSuite {
        action: field(payload, KIND, "/action")?.to_string(),
        owner: field(payload, KIND, "/repository/owner/login")?.to_string(),
        repo: field(payload, KIND, "/repository/name")?.to_string(),
        branch: field(payload, KIND, "/check_suite/head_branch")?.to_string(),
        sha: field(payload, KIND, "/check_suite/head_sha")?.to_string(),
    })
}

fn parse_check_run(payload: &Value) -> Result<WebhookEvent, EventError> {
    const KIND: &str = "check_run";
    Ok(WebhookEvent::CheckRun {
        action: field(payload, KIND, "/action")?.to_string(),
        requested_action: payload
            .pointer("/requested_action/identifier")
            .and_then(Value::as_str)
            .map(str::to_string),
        owner: field(payload, KIND, "/repository/owner/login")?.to_string(),
        repo: field(payload, KIND, "/repository/name")?.to_string(),
        branch: field(payload, KIND, "/check_run/check_suite/head_branch")?.to_string(),
        sha: field(payload, KIND, "/check_run/head_sha")?.to_string(),
    })
}

fn parse_pull_request(payload: &Value) -> Result<WebhookEvent, EventError> {
    const KIND: &str = "pull_request";
    Ok(WebhookEvent::PullRequest {
        action: field(payload, KIND, "/action")?.to_string(),
        owner: field(payload, KIND, "/repository/owner/login")?.to_string(),
        repo: field(payload, KIND, "/repository/name")?.to_string(),
        branch: field(payload, KIND, "/pull_request/head/ref")?.to_string(),
        sha: field(payload, KIND, "/pull_request/head/sha")?.to_string(),
    })
}

/// A run derived from an event, to be created against every workspace
/// connected to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_name: String,
    pub command: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub sha: String,
}

impl RunRequest {
    /// Materialize the request as a Run resource against a workspace. The
    /// commit context rides along as labels so operators can trace a run
    /// back to the change that produced it.
    pub fn to_run(&self, namespace: &str, workspace: &str) -> gw_core::Run {
        let mut run = gw_core::Run::new(namespace, &self.run_name, workspace, &self.command);
        run.meta
            .labels
            .insert("groundwork.dev/sha".to_string(), self.sha.clone());
        run.meta
            .labels
            .insert("groundwork.dev/branch".to_string(), self.branch.clone());
        run.meta.labels.insert(
            "groundwork.dev/repo".to_string(),
            format!("{}/{}", self.owner, self.repo),
        );
        run
    }
}

fn generated_run_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &id[..8])
}

/// Derive run requests from an event: plans for new or re-requested
/// changes, an apply when a user triggers the apply action on a check.
pub fn run_requests(event: &WebhookEvent) -> Vec<RunRequest> {
    let (command, owner, repo, branch, sha) = match event {
        WebhookEvent::CheckSuite {
            action,
            owner,
            repo,
            branch,
            sha,
        } if action == "requested" || action == "rerequested" => {
            ("plan", owner, repo, branch, sha)
        }
        WebhookEvent::PullRequest {
            action,
            owner,
            repo,
            branch,
            sha,
        } if action == "opened" || action == "synchronize" => ("plan", owner, repo, branch, sha),
        WebhookEvent::CheckRun {
            requested_action: Some(requested),
            owner,
            repo,
            branch,
            sha,
            ..
        } if requested == "apply" => ("apply", owner, repo, branch, sha),
        _ => return Vec::new(),
    };

    vec![RunRequest {
        run_name: generated_run_name(),
        command: command.to_string(),
        owner: owner.clone(),
        repo: repo.clone(),
        branch: branch.clone(),
        sha: sha.clone(),
    }]
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
