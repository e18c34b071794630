//! Lifecycle policies: the only code allowed to choose a queue's
//! lifecycle state.

use queue_core::{DesiredState, LifecycleState, QueueCounts, QueueStatus};

use crate::aggregator::Aggregation;

/// Computes a queue's next status.
///
/// `groups` is `None` when the caller wants a pure state transition with no
/// workload accounting. When it is `Some`, the returned status is expected to
/// carry `groups.counts`.
pub trait LifecyclePolicy: Send + Sync {
    fn apply(&self, current: &QueueStatus, groups: Option<&Aggregation>) -> QueueStatus;
}

impl<F> LifecyclePolicy for F
where
    F: Fn(&QueueStatus, Option<&Aggregation>) -> QueueStatus + Send + Sync,
{
    fn apply(&self, current: &QueueStatus, groups: Option<&Aggregation>) -> QueueStatus {
        self(current, groups)
    }
}

/// Fresh counts when group context is given, the stored ones otherwise.
pub fn folded_counts(current: &QueueStatus, groups: Option<&Aggregation>) -> QueueCounts {
    groups.map_or(current.counts, |g| g.counts)
}

/// Built-in policies used by the per-state handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePolicy {
    /// Always report this lifecycle state.
    Set(LifecycleState),
    /// Closed once no group is active, Closing while any is.
    Drain,
    /// Derive the lifecycle state from the desired state.
    FollowDesired(DesiredState),
}

impl LifecyclePolicy for StatePolicy {
    fn apply(&self, current: &QueueStatus, groups: Option<&Aggregation>) -> QueueStatus {
        let counts = folded_counts(current, groups);
        let state = match self {
            StatePolicy::Set(state) => *state,
            StatePolicy::Drain | StatePolicy::FollowDesired(DesiredState::Closed) => {
                drained_state(&counts)
            }
            StatePolicy::FollowDesired(DesiredState::Open) => LifecycleState::Open,
        };
        QueueStatus::new(state, counts)
    }
}

fn drained_state(counts: &QueueCounts) -> LifecycleState {
    if counts.active() == 0 {
        LifecycleState::Closed
    } else {
        LifecycleState::Closing
    }
}
