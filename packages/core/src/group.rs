//! Workload group types: units of submitted work bound to a queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

/// Unique identifier for a workload group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub Ulid);

impl GroupId {
    /// Create a new unique group ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A workload group key that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed workload group key: {0:?}")]
pub struct ParseKeyError(pub String);

/// `namespace/name` address of a workload group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadGroupKey {
    /// Empty for groups that are not namespaced.
    pub namespace: String,
    pub name: String,
}

impl WorkloadGroupKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `namespace/name` or a bare `name`.
    pub fn parse(key: &str) -> Result<Self, ParseKeyError> {
        let mut parts = key.split('/');
        let (namespace, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => ("", name),
            (Some(namespace), Some(name), None) => (namespace, name),
            _ => return Err(ParseKeyError(key.to_string())),
        };

        if name.is_empty() {
            return Err(ParseKeyError(key.to_string()));
        }

        Ok(Self::new(namespace, name))
    }
}

impl std::fmt::Display for WorkloadGroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

impl std::str::FromStr for WorkloadGroupKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Observed phase of a workload group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPhase {
    /// Submitted but not yet admitted.
    #[default]
    Pending,
    /// Admitted and holding resources.
    Running,
    /// Some members are in an unexpected state.
    Unknown,
    /// Admitted to the queue, waiting for placement.
    Inqueue,
    /// Finished; no longer counted against the queue.
    Completed,
}

impl GroupPhase {
    /// Get a simple phase string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupPhase::Pending => "pending",
            GroupPhase::Running => "running",
            GroupPhase::Unknown => "unknown",
            GroupPhase::Inqueue => "inqueue",
            GroupPhase::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GroupPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of submitted work bound to exactly one queue by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadGroup {
    pub key: WorkloadGroupKey,
    pub uid: GroupId,
    /// Name of the queue this group is bound to.
    pub queue: String,
    pub phase: GroupPhase,
    /// Minimum number of members that must run together.
    #[serde(default = "default_min_member")]
    pub min_member: u32,
    pub created_at: DateTime<Utc>,
}

fn default_min_member() -> u32 {
    1
}

impl WorkloadGroup {
    /// Create a new pending group bound to `queue`.
    pub fn new(key: WorkloadGroupKey, queue: impl Into<String>) -> Self {
        Self {
            key,
            uid: GroupId::new(),
            queue: queue.into(),
            phase: GroupPhase::Pending,
            min_member: default_min_member(),
            created_at: Utc::now(),
        }
    }

    /// Set the phase for this group.
    pub fn with_phase(mut self, phase: GroupPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Set the minimum member count for this group.
    pub fn with_min_member(mut self, min_member: u32) -> Self {
        self.min_member = min_member;
        self
    }
}
