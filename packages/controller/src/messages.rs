//! Message types for actor communication.

use queue_core::{QueueAction, QueueEvent};
use ractor::RpcReplyPort;

/// Messages for the Supervisor.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Dispatch an action to the worker owning `name`.
    Reconcile { name: String, action: QueueAction },

    /// Dispatch `SyncQueue` for every stored queue.
    Resync,

    /// Names of the queues that currently have a worker.
    ListWorkers { reply: RpcReplyPort<Vec<String>> },

    /// Subscribe to events.
    Subscribe {
        sender: tokio::sync::broadcast::Sender<QueueEvent>,
    },

    /// Stop all workers and the supervisor.
    Shutdown,
}

/// Messages for a QueueWorker.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Reconcile the worker's queue now.
    Reconcile { action: QueueAction },

    /// Run the worker's pending retry, if it still has one.
    Retry,

    /// Stop the worker.
    Shutdown,
}
