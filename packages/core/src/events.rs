//! Reconcile actions and the user-visible events they emit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of reconcile work dispatched for a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueAction {
    /// Refresh status without touching the desired state.
    #[default]
    SyncQueue,
    /// Set the desired state to open.
    OpenQueue,
    /// Set the desired state to closed.
    CloseQueue,
}

impl QueueAction {
    /// Reason string attached to events emitted by this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::SyncQueue => "SyncQueue",
            QueueAction::OpenQueue => "OpenQueue",
            QueueAction::CloseQueue => "CloseQueue",
        }
    }
}

impl std::fmt::Display for QueueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Normal => write!(f, "Normal"),
            EventType::Warning => write!(f, "Warning"),
        }
    }
}

/// An outcome event recorded against a queue, for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Name of the queue the event is about.
    pub queue: String,
    pub event_type: EventType,
    /// The action that produced the event.
    pub reason: QueueAction,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl QueueEvent {
    /// Create an event stamped with the current time.
    pub fn new(
        queue: impl Into<String>,
        event_type: EventType,
        reason: QueueAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            queue: queue.into(),
            event_type,
            reason,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Check if the event reports a failure.
    pub fn is_warning(&self) -> bool {
        self.event_type == EventType::Warning
    }

    /// One-line rendering used in logs.
    pub fn description(&self) -> String {
        format!(
            "{} {} queue '{}': {}",
            self.event_type, self.reason, self.queue, self.message
        )
    }
}
