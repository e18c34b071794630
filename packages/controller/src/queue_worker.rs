//! Per-queue worker actor.
//!
//! One worker exists per queue name and handles its messages one at a time,
//! so at most one reconcile is in flight for any queue. Failed requests
//! collapse into a single pending retry per worker.

use std::marker::PhantomData;
use std::sync::Arc;

use queue_core::QueueAction;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::messages::WorkerMessage;
use crate::reconciler::QueueReconciler;
use crate::recorder::EventRecorder;
use crate::store::{GroupIndex, QueueStore};

/// A retry waiting for its backoff to elapse.
struct PendingRetry {
    action: QueueAction,
    /// Consecutive failures so far.
    attempt: u32,
    timer: JoinHandle<()>,
}

/// State for the queue worker.
pub struct QueueWorkerState<S, I, R> {
    /// Name of the queue this worker reconciles.
    pub name: String,
    reconciler: Arc<QueueReconciler<S, I, R>>,
    config: ControllerConfig,
    pending: Option<PendingRetry>,
}

/// Worker actor arguments.
pub struct QueueWorkerArgs<S, I, R> {
    pub name: String,
    pub reconciler: Arc<QueueReconciler<S, I, R>>,
    pub config: ControllerConfig,
}

/// Worker actor that reconciles a single queue.
pub struct QueueWorker<S, I, R>(PhantomData<fn() -> (S, I, R)>);

impl<S, I, R> QueueWorker<S, I, R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S, I, R> Default for QueueWorker<S, I, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, I, R> QueueWorkerState<S, I, R>
where
    S: QueueStore,
    I: GroupIndex,
    R: EventRecorder,
{
    /// Fetch the queue and run `action` on it, routing any failure.
    ///
    /// Only a missing queue ends the request; every other store error,
    /// including a group that vanished mid-aggregation, is retried.
    async fn run(&mut self, myself: &ActorRef<WorkerMessage>, action: QueueAction, attempt: u32) {
        let queue = match self.reconciler.store().get(&self.name).await {
            Ok(queue) => queue,
            Err(e) if e.is_not_found() => {
                tracing::info!("Queue {} is gone, dropping {}", self.name, action);
                self.cancel_retry();
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch queue {} for {}: {}", self.name, action, e);
                self.schedule_retry(myself, action, attempt);
                return;
            }
        };

        match self.reconciler.execute(&queue, action).await {
            Ok(()) => {
                if self.pending.as_ref().is_some_and(|p| p.action == action) {
                    self.cancel_retry();
                }
            }
            Err(e) if e.is_transient() => {
                tracing::warn!("Failed to {} queue {}: {}", action, self.name, e);
                self.schedule_retry(myself, action, attempt);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to {} queue {}, not retrying: {}",
                    action,
                    self.name,
                    e
                );
            }
        }
    }

    /// Arm the worker's single retry slot.
    ///
    /// An already pending retry is folded in: its backoff keeps growing, and
    /// a pending Open or Close is not downgraded to a Sync.
    fn schedule_retry(
        &mut self,
        myself: &ActorRef<WorkerMessage>,
        action: QueueAction,
        attempt: u32,
    ) {
        let (action, attempt) = match self.pending.take() {
            Some(pending) => {
                pending.timer.abort();
                let action = if action == QueueAction::SyncQueue {
                    pending.action
                } else {
                    action
                };
                (action, attempt.max(pending.attempt))
            }
            None => (action, attempt),
        };

        let delay = self.config.backoff(attempt);
        tracing::debug!(
            "Retrying {} for queue {} in {:?} (attempt {})",
            action,
            self.name,
            delay,
            attempt.saturating_add(1)
        );

        let myself = myself.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The worker may have been stopped meanwhile.
            let _ = myself.send_message(WorkerMessage::Retry);
        });

        self.pending = Some(PendingRetry {
            action,
            attempt: attempt.saturating_add(1),
            timer,
        });
    }

    fn cancel_retry(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }
}

impl<S, I, R> Actor for QueueWorker<S, I, R>
where
    S: QueueStore,
    I: GroupIndex,
    R: EventRecorder,
{
    type Msg = WorkerMessage;
    type State = QueueWorkerState<S, I, R>;
    type Arguments = QueueWorkerArgs<S, I, R>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting queue worker: {}", args.name);
        Ok(QueueWorkerState {
            name: args.name,
            reconciler: args.reconciler,
            config: args.config,
            pending: None,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.cancel_retry();
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Reconcile { action } => {
                state.run(&myself, action, 0).await;
            }

            WorkerMessage::Retry => {
                // Cancelled or superseded since the timer fired.
                let Some(pending) = state.pending.take() else {
                    return Ok(());
                };
                state.run(&myself, pending.action, pending.attempt).await;
            }

            WorkerMessage::Shutdown => {
                tracing::info!("Shutting down queue worker: {}", state.name);
                myself.stop(None);
            }
        }

        Ok(())
    }
}
