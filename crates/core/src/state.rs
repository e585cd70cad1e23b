// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-file parsing: raw state bytes to serial and outputs.

use crate::resources::Secret;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key under which the state secret holds the raw state payload.
pub const STATE_DATA_KEY: &str = "tfstate";

/// Errors from parsing a state payload. Malformed state is not retryable
/// by content: reconciling again against the same bytes fails the same way.
#[derive(Debug, Error)]
pub enum StateParseError {
    #[error("state secret has no '{STATE_DATA_KEY}' payload")]
    MissingPayload,
    #[error("malformed state file: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawState {
    serial: u64,
    #[serde(default)]
    outputs: BTreeMap<String, RawOutput>,
}

#[derive(Deserialize)]
struct RawOutput {
    value: serde_json::Value,
}

/// Parsed state file: monotonic serial plus output name/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub serial: u64,
    pub outputs: BTreeMap<String, String>,
}

impl State {
    /// Parse raw state bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, StateParseError> {
        let raw: RawState = serde_json::from_slice(bytes)?;
        let outputs = raw
            .outputs
            .into_iter()
            .map(|(name, output)| (name, render_value(output.value)))
            .collect();
        Ok(Self {
            serial: raw.serial,
            outputs,
        })
    }

    /// Parse the state payload held in a state secret.
    pub fn from_secret(secret: &Secret) -> Result<Self, StateParseError> {
        let bytes = secret
            .data
            .get(STATE_DATA_KEY)
            .ok_or(StateParseError::MissingPayload)?;
        Self::parse(bytes)
    }
}

/// Render an output value for status display. Strings are taken as-is;
/// anything else keeps its JSON rendering.
fn render_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
