//! Default policy catalogue: picks the reconcile entry point and the policy
//! to inject, based on the queue's current lifecycle state.
//!
//! | state \ action | SyncQueue              | OpenQueue  | CloseQueue                 |
//! |----------------|------------------------|------------|----------------------------|
//! | Open           | sync, follow desired   | set Open   | drain                      |
//! | Closing        | sync, follow desired   | set Open   | drain                      |
//! | Closed         | sync, follow desired   | set Open   | set Closed                 |
//! | Unknown        | sync, follow desired   | set Open   | drain                      |
//!
//! Open and Close run through the transition entry points while the desired
//! state still has to change, and through sync once it already matches.

use queue_core::{DesiredState, LifecycleState, Queue, QueueAction};

use crate::policy::StatePolicy;

/// What to run for one dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// The reconcile entry point to invoke.
    pub entry: QueueAction,
    pub policy: StatePolicy,
}

impl Plan {
    fn sync(policy: StatePolicy) -> Self {
        Self {
            entry: QueueAction::SyncQueue,
            policy,
        }
    }

    fn transition(entry: QueueAction, policy: StatePolicy) -> Self {
        Self { entry, policy }
    }
}

/// Select the entry point and policy for `action` on `queue`.
pub fn plan(queue: &Queue, action: QueueAction) -> Plan {
    let desired = queue.spec.desired_state;
    let state = queue.status.state;

    match action {
        QueueAction::SyncQueue => Plan::sync(StatePolicy::FollowDesired(desired)),

        QueueAction::OpenQueue => {
            let policy = StatePolicy::Set(LifecycleState::Open);
            if desired == DesiredState::Open {
                Plan::sync(policy)
            } else {
                Plan::transition(QueueAction::OpenQueue, policy)
            }
        }

        QueueAction::CloseQueue => {
            let policy = match state {
                LifecycleState::Closed => StatePolicy::Set(LifecycleState::Closed),
                LifecycleState::Open | LifecycleState::Closing | LifecycleState::Unknown => {
                    StatePolicy::Drain
                }
            };
            if desired == DesiredState::Closed {
                Plan::sync(policy)
            } else {
                Plan::transition(QueueAction::CloseQueue, policy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_core::{QueueCounts, QueueStatus};

    fn queue(desired: DesiredState, state: LifecycleState) -> Queue {
        Queue::new("q")
            .with_desired_state(desired)
            .with_status(QueueStatus::new(state, QueueCounts::default()))
    }

    #[test]
    fn sync_follows_desired_state_in_every_state() {
        for state in [
            LifecycleState::Open,
            LifecycleState::Closing,
            LifecycleState::Closed,
            LifecycleState::Unknown,
        ] {
            let plan = plan(&queue(DesiredState::Closed, state), QueueAction::SyncQueue);
            assert_eq!(plan.entry, QueueAction::SyncQueue);
            assert_eq!(plan.policy, StatePolicy::FollowDesired(DesiredState::Closed));
        }
    }

    #[test]
    fn open_transitions_only_when_desired_differs() {
        let closed = plan(
            &queue(DesiredState::Closed, LifecycleState::Closed),
            QueueAction::OpenQueue,
        );
        assert_eq!(closed.entry, QueueAction::OpenQueue);
        assert_eq!(closed.policy, StatePolicy::Set(LifecycleState::Open));

        let open = plan(
            &queue(DesiredState::Open, LifecycleState::Open),
            QueueAction::OpenQueue,
        );
        assert_eq!(open.entry, QueueAction::SyncQueue);
    }

    #[test]
    fn close_drains_unless_already_closed() {
        let open = plan(
            &queue(DesiredState::Open, LifecycleState::Open),
            QueueAction::CloseQueue,
        );
        assert_eq!(open.entry, QueueAction::CloseQueue);
        assert_eq!(open.policy, StatePolicy::Drain);

        let closing = plan(
            &queue(DesiredState::Closed, LifecycleState::Closing),
            QueueAction::CloseQueue,
        );
        assert_eq!(closing.entry, QueueAction::SyncQueue);
        assert_eq!(closing.policy, StatePolicy::Drain);

        let closed = plan(
            &queue(DesiredState::Closed, LifecycleState::Closed),
            QueueAction::CloseQueue,
        );
        assert_eq!(closed.policy, StatePolicy::Set(LifecycleState::Closed));
    }
}
