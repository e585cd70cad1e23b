// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type returned by reconcilers.

use crate::backup::ProviderError;
use gw_core::StateParseError;
use gw_store::StoreError;
use thiserror::Error;

/// A non-nil reconcile error aborts the rest of the status chain and makes
/// the dispatcher retry the key with exponential backoff.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Parse(#[from] StateParseError),

    /// The cache volume claim lost its persistent volume. Terminal; there
    /// is no automated remediation.
    #[error("volume claim has lost its persistent volume")]
    ClaimLost,

    /// A child resource reported a phase this controller does not
    /// recognize. Forces an explicit retry rather than a silent stall.
    #[error("unrecognized {kind} phase: {phase}")]
    UnrecognizedPhase { kind: &'static str, phase: String },
}
