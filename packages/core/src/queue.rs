//! Queue domain types: operator intent (spec) and observed status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier assigned to a queue when it is created.
///
/// Queues are addressed by name; the uid only distinguishes a queue from an
/// older, deleted queue that carried the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(pub Ulid);

impl QueueId {
    /// Create a new unique queue ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for QueueId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State requested by the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredState {
    /// Queue should accept and run workload groups.
    #[default]
    Open,
    /// Queue should stop accepting work and drain.
    Closed,
}

impl std::fmt::Display for DesiredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesiredState::Open => write!(f, "open"),
            DesiredState::Closed => write!(f, "closed"),
        }
    }
}

/// Lifecycle state computed by the controller.
///
/// Only a lifecycle policy decides this value; every other code path copies
/// it forward unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Open,
    /// Closed was requested but workload groups are still active.
    Closing,
    Closed,
    /// Not yet observed, or the desired state could not be interpreted.
    #[default]
    Unknown,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Open => write!(f, "open"),
            LifecycleState::Closing => write!(f, "closing"),
            LifecycleState::Closed => write!(f, "closed"),
            LifecycleState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Desired configuration of a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSpec {
    pub desired_state: DesiredState,
}

/// Number of bound workload groups in each counted phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueCounts {
    pub pending: u32,
    pub running: u32,
    pub unknown: u32,
    pub inqueue: u32,
}

impl QueueCounts {
    /// Groups that still hold or wait for resources.
    pub fn active(&self) -> u32 {
        self.pending
            .saturating_add(self.running)
            .saturating_add(self.unknown)
            .saturating_add(self.inqueue)
    }
}

/// Observed status of a queue.
///
/// Compared as a whole value to decide whether a status write is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStatus {
    pub state: LifecycleState,
    pub counts: QueueCounts,
}

impl QueueStatus {
    /// Build a status from a lifecycle state and counts.
    pub fn new(state: LifecycleState, counts: QueueCounts) -> Self {
        Self { state, counts }
    }
}

/// A named admission and accounting boundary for workload groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    /// Unique name; the identity used by the store and the dispatcher.
    pub name: String,
    pub uid: QueueId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub spec: QueueSpec,
    pub status: QueueStatus,
    /// Bumped by the store on every write; writes carrying a stale value
    /// are rejected.
    #[serde(default)]
    pub resource_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Queue {
    /// Create a new open queue with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            uid: QueueId::new(),
            description: None,
            spec: QueueSpec::default(),
            status: QueueStatus::default(),
            resource_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description for this queue.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the desired state for this queue.
    pub fn with_desired_state(mut self, desired_state: DesiredState) -> Self {
        self.spec.desired_state = desired_state;
        self
    }

    /// Set the observed status for this queue.
    pub fn with_status(mut self, status: QueueStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_counts_exclude_nothing_counted() {
        let counts = QueueCounts {
            pending: 1,
            running: 2,
            unknown: 3,
            inqueue: 4,
        };
        assert_eq!(counts.active(), 10);
        assert_eq!(QueueCounts::default().active(), 0);
    }
}
