//! Supervisor actor: owns one worker per queue name and routes requests.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use queue_core::{QueueAction, QueueEvent};
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use tokio::sync::broadcast;

use crate::config::ControllerConfig;
use crate::messages::{SupervisorMessage, WorkerMessage};
use crate::queue_worker::{QueueWorker, QueueWorkerArgs};
use crate::reconciler::QueueReconciler;
use crate::recorder::EventRecorder;
use crate::store::{GroupIndex, QueueStore};

/// Supervisor start-up arguments.
pub struct SupervisorArgs<S, I, R> {
    pub reconciler: Arc<QueueReconciler<S, I, R>>,
    pub config: ControllerConfig,
    /// Source stream for `Subscribe`; subscriptions are ignored when unset.
    pub events: Option<broadcast::Sender<QueueEvent>>,
}

/// State for the supervisor actor.
pub struct SupervisorState<S, I, R> {
    /// Worker actors by queue name.
    pub workers: HashMap<String, ActorRef<WorkerMessage>>,
    reconciler: Arc<QueueReconciler<S, I, R>>,
    config: ControllerConfig,
    events: Option<broadcast::Sender<QueueEvent>>,
}

impl<S, I, R> SupervisorState<S, I, R>
where
    S: QueueStore,
    I: GroupIndex,
    R: EventRecorder,
{
    /// Get the worker for `name`, spawning it on first use.
    async fn worker_for(
        &mut self,
        myself: &ActorRef<SupervisorMessage>,
        name: &str,
    ) -> Result<ActorRef<WorkerMessage>, ActorProcessingErr> {
        if let Some(worker) = self.workers.get(name) {
            return Ok(worker.clone());
        }

        let args = QueueWorkerArgs {
            name: name.to_string(),
            reconciler: self.reconciler.clone(),
            config: self.config.clone(),
        };

        let (worker, _handle) =
            Actor::spawn_linked(None, QueueWorker::<S, I, R>::new(), args, myself.get_cell())
                .await
                .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn worker: {}", e)))?;

        self.workers.insert(name.to_string(), worker.clone());
        Ok(worker)
    }

    async fn dispatch(
        &mut self,
        myself: &ActorRef<SupervisorMessage>,
        name: String,
        action: QueueAction,
    ) -> Result<(), ActorProcessingErr> {
        let worker = self.worker_for(myself, &name).await?;

        if worker
            .send_message(WorkerMessage::Reconcile { action })
            .is_err()
        {
            // Stopped between lookup and send; the next request respawns it.
            tracing::warn!("Worker for queue {} is gone, dropping {}", name, action);
            self.workers.remove(&name);
        }

        Ok(())
    }
}

/// Supervisor actor that manages all queue workers.
pub struct Supervisor<S, I, R>(PhantomData<fn() -> (S, I, R)>);

impl<S, I, R> Supervisor<S, I, R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S, I, R> Default for Supervisor<S, I, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, I, R> Actor for Supervisor<S, I, R>
where
    S: QueueStore,
    I: GroupIndex,
    R: EventRecorder,
{
    type Msg = SupervisorMessage;
    type State = SupervisorState<S, I, R>;
    type Arguments = SupervisorArgs<S, I, R>;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting queue controller supervisor");

        // Start periodic resync
        let resync_interval = args.config.resync_interval;
        let myself_clone = myself.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(resync_interval);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if myself_clone.send_message(SupervisorMessage::Resync).is_err() {
                    break;
                }
            }
        });

        Ok(SupervisorState {
            workers: HashMap::new(),
            reconciler: args.reconciler,
            config: args.config,
            events: args.events,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::Reconcile { name, action } => {
                state.dispatch(&myself, name, action).await?;
            }

            SupervisorMessage::Resync => {
                let listed = state.reconciler.store().list().await;
                match listed {
                    Ok(queues) => {
                        tracing::debug!("Resyncing {} queues", queues.len());
                        for queue in queues {
                            state
                                .dispatch(&myself, queue.name, QueueAction::SyncQueue)
                                .await?;
                        }
                    }
                    Err(e) => tracing::warn!("Failed to list queues for resync: {}", e),
                }
            }

            SupervisorMessage::ListWorkers { reply } => {
                let mut names: Vec<String> = state.workers.keys().cloned().collect();
                names.sort();
                let _ = reply.send(names);
            }

            SupervisorMessage::Subscribe { sender } => {
                let Some(events) = &state.events else {
                    tracing::warn!("Subscribe ignored: no event stream configured");
                    return Ok(());
                };

                // Forward from our channel to the subscriber's
                let mut rx = events.subscribe();
                tokio::spawn(async move {
                    while let Ok(event) = rx.recv().await {
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                });
            }

            SupervisorMessage::Shutdown => {
                tracing::info!("Shutting down queue controller supervisor");
                for worker in state.workers.values() {
                    let _ = worker.send_message(WorkerMessage::Shutdown);
                }
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                tracing::debug!("Queue worker {} stopped: {:?}", cell.get_id(), reason);
                state.workers.retain(|_, worker| worker.get_id() != cell.get_id());
            }
            SupervisionEvent::ActorFailed(cell, err) => {
                tracing::warn!("Queue worker {} failed: {}", cell.get_id(), err);
                state.workers.retain(|_, worker| worker.get_id() != cell.get_id());
            }
            _ => {}
        }
        Ok(())
    }
}

/// Start the supervisor with the given arguments.
pub async fn start_supervisor<S, I, R>(
    args: SupervisorArgs<S, I, R>,
) -> Result<(ActorRef<SupervisorMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr>
where
    S: QueueStore,
    I: GroupIndex,
    R: EventRecorder,
{
    Actor::spawn(None, Supervisor::<S, I, R>::new(), args).await
}
