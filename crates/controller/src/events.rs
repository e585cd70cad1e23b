// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event recording for operator-visible occurrences.

use gw_core::ObjectKey;

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// Records events against an object: a machine-readable reason plus a
/// human message. Recording is fire-and-forget; failures to record must
/// never fail a reconcile.
pub trait EventRecorder: Send + Sync + 'static {
    fn event(&self, object: &ObjectKey, event_type: EventType, reason: &str, message: &str);

    fn normal(&self, object: &ObjectKey, reason: &str, message: &str) {
        self.event(object, EventType::Normal, reason, message);
    }

    fn warning(&self, object: &ObjectKey, reason: &str, message: &str) {
        self.event(object, EventType::Warning, reason, message);
    }
}

/// Recorder that emits events to the tracing subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn event(&self, object: &ObjectKey, event_type: EventType, reason: &str, message: &str) {
        match event_type {
            EventType::Normal => {
                tracing::info!(object = %object, reason, message, "event");
            }
            EventType::Warning => {
                tracing::warn!(object = %object, reason, message, "event");
            }
        }
    }
}

/// One event captured by [`RecordingRecorder`].
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object: ObjectKey,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

/// Recorder that captures events for assertions.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct RecordingRecorder {
    events: std::sync::Arc<parking_lot::Mutex<Vec<RecordedEvent>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Reasons of all recorded events, in order.
    pub fn reasons(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.reason.clone()).collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl EventRecorder for RecordingRecorder {
    fn event(&self, object: &ObjectKey, event_type: EventType, reason: &str, message: &str) {
        self.events.lock().push(RecordedEvent {
            object: object.clone(),
            event_type,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }
}
