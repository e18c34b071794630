//! Queue lifecycle controller.
//!
//! Keeps each queue's observed status consistent with its desired state and
//! with the live phases of the workload groups bound to it.
//!
//! # Architecture
//!
//! - `aggregator` - Tallies bound workload groups by phase
//! - `policy` - Pluggable lifecycle policies that compute the next status
//! - `lifecycle` - Default per-state choice of entry point and policy
//! - `QueueReconciler` - The Sync, Open and Close actions
//! - `Supervisor` / `QueueWorker` - Ractor actors dispatching one reconcile
//!   at a time per queue, with retry on failure
//!
//! # Usage
//!
//! ```ignore
//! use queue_controller::*;
//!
//! let recorder = BroadcastRecorder::new(1024);
//! let reconciler = QueueReconciler::new(SurrealQueueStore, SurrealGroupIndex, recorder.clone());
//! let (supervisor, handle) = start_supervisor(SupervisorArgs {
//!     reconciler: Arc::new(reconciler),
//!     config: ControllerConfig::from_env(),
//!     events: Some(recorder.sender()),
//! })
//! .await?;
//!
//! supervisor.send_message(SupervisorMessage::Reconcile {
//!     name: "q1".into(),
//!     action: QueueAction::CloseQueue,
//! })?;
//! ```

pub mod aggregator;
mod config;
mod error;
pub mod lifecycle;
mod messages;
pub mod policy;
mod queue_worker;
mod reconciler;
mod recorder;
mod store;
mod supervisor;

pub use aggregator::{Aggregation, aggregate, count_phases};
pub use config::ControllerConfig;
pub use error::{ControllerError, ControllerResult};
pub use lifecycle::Plan;
pub use messages::{SupervisorMessage, WorkerMessage};
pub use policy::{LifecyclePolicy, StatePolicy};
pub use queue_worker::QueueWorker;
pub use reconciler::QueueReconciler;
pub use recorder::{BroadcastRecorder, EventRecorder};
pub use store::{GroupCache, GroupIndex, QueueStore, SurrealGroupIndex, SurrealQueueStore};
pub use supervisor::{Supervisor, SupervisorArgs, start_supervisor};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
