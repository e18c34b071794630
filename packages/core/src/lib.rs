//! Core domain types for the queue lifecycle controller.
//!
//! This crate contains shared types used across all packages:
//! - Queue, QueueSpec and QueueStatus for admission boundaries
//! - WorkloadGroup and GroupPhase for work bound to a queue
//! - QueueAction and QueueEvent for reconcile outcomes

mod events;
mod group;
mod queue;

pub use events::{EventType, QueueAction, QueueEvent};
pub use group::{GroupId, GroupPhase, ParseKeyError, WorkloadGroup, WorkloadGroupKey};
pub use queue::{
    DesiredState, LifecycleState, Queue, QueueCounts, QueueId, QueueSpec, QueueStatus,
};
