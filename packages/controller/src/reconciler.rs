//! Reconcile actions: Sync, Open and Close.
//!
//! Each action works on freshly fetched data, asks a lifecycle policy for the
//! next status, and writes only when something changed. Nothing is retried
//! here; a returned error means the caller should re-enqueue the queue.

use queue_core::{DesiredState, EventType, Queue, QueueAction, QueueStatus};

use crate::aggregator::aggregate;
use crate::error::{ControllerError, ControllerResult};
use crate::lifecycle;
use crate::policy::LifecyclePolicy;
use crate::recorder::EventRecorder;
use crate::store::{GroupIndex, QueueStore};

/// Runs reconcile actions against a store, a group index and an event sink.
pub struct QueueReconciler<S, I, R> {
    store: S,
    index: I,
    recorder: R,
}

impl<S, I, R> QueueReconciler<S, I, R>
where
    S: QueueStore,
    I: GroupIndex,
    R: EventRecorder,
{
    pub fn new(store: S, index: I, recorder: R) -> Self {
        Self {
            store,
            index,
            recorder,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Run `action` with the entry point and policy the default catalogue
    /// picks for the queue's current lifecycle state.
    pub async fn execute(&self, queue: &Queue, action: QueueAction) -> ControllerResult<()> {
        let plan = lifecycle::plan(queue, action);
        tracing::debug!(
            "Queue {} in state {} handles {} via {} with {:?}",
            queue.name,
            queue.status.state,
            action,
            plan.entry,
            plan.policy
        );

        let policy: &dyn LifecyclePolicy = &plan.policy;
        match plan.entry {
            QueueAction::SyncQueue => self.sync_queue(queue, Some(policy)).await,
            QueueAction::OpenQueue => self.open_queue(queue, Some(policy)).await,
            QueueAction::CloseQueue => self.close_queue(queue, Some(policy)).await,
        }
    }

    /// Recompute the queue's status from its bound groups and persist it if
    /// it changed. `queue.spec` is never touched.
    ///
    /// Without a policy the stored lifecycle state is carried forward and only
    /// the counts are refreshed.
    pub async fn sync_queue(
        &self,
        queue: &Queue,
        policy: Option<&dyn LifecyclePolicy>,
    ) -> ControllerResult<()> {
        tracing::debug!("Begin to sync queue {}.", queue.name);

        let groups = aggregate(&self.index, &queue.name).await?;

        let status = match policy {
            Some(policy) => policy.apply(&queue.status, Some(&groups)),
            None => QueueStatus::new(queue.status.state, groups.counts),
        };

        if status == queue.status {
            return Ok(());
        }

        let mut updated = queue.clone();
        updated.status = status;

        if let Err(e) = self.store.update_status(&updated).await {
            tracing::error!("Failed to update status of queue {}: {}", queue.name, e);
            return Err(e.into());
        }

        Ok(())
    }

    /// Set the desired state to open, then let `policy` compute the new status
    /// from the refetched queue alone.
    pub async fn open_queue(
        &self,
        queue: &Queue,
        policy: Option<&dyn LifecyclePolicy>,
    ) -> ControllerResult<()> {
        tracing::debug!("Begin to open queue {}.", queue.name);
        self.transition(queue, DesiredState::Open, QueueAction::OpenQueue, policy)
            .await
    }

    /// Set the desired state to closed, then let `policy` compute the new
    /// status from the refetched queue and its bound groups.
    pub async fn close_queue(
        &self,
        queue: &Queue,
        policy: Option<&dyn LifecyclePolicy>,
    ) -> ControllerResult<()> {
        tracing::debug!("Begin to close queue {}.", queue.name);
        self.transition(queue, DesiredState::Closed, QueueAction::CloseQueue, policy)
            .await
    }

    async fn transition(
        &self,
        queue: &Queue,
        target: DesiredState,
        action: QueueAction,
        policy: Option<&dyn LifecyclePolicy>,
    ) -> ControllerResult<()> {
        if queue.spec.desired_state == target {
            return Ok(());
        }

        // Must precede the spec write.
        let Some(policy) = policy else {
            return Err(ControllerError::MissingPolicy { action });
        };

        let verb = match target {
            DesiredState::Open => "Open",
            DesiredState::Closed => "Close",
        };

        let mut desired = queue.clone();
        desired.spec.desired_state = target;

        if let Err(e) = self.store.update_spec(&desired).await {
            self.recorder.record(
                &desired,
                EventType::Warning,
                action,
                format!("{} queue failed for {}", verb, e),
            );
            return Err(e.into());
        }

        self.recorder.record(
            &desired,
            EventType::Normal,
            action,
            format!("{} queue succeeded", verb),
        );

        // The `spec` write bumped the resource version; start from the stored copy.
        let mut refreshed = self.store.get(&queue.name).await?;

        let groups = match target {
            DesiredState::Open => None,
            DesiredState::Closed => Some(aggregate(&self.index, &refreshed.name).await?),
        };
        refreshed.status = policy.apply(&refreshed.status, groups.as_ref());

        if refreshed.status.state == queue.status.state {
            return Ok(());
        }

        if let Err(e) = self.store.update_status(&refreshed).await {
            self.recorder.record(
                &refreshed,
                EventType::Warning,
                action,
                format!(
                    "Update queue status from {} to {} failed for {}",
                    queue.status.state, refreshed.status.state, e
                ),
            );
            return Err(e.into());
        }

        Ok(())
    }
}
