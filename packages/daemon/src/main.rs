//! Standalone queue lifecycle controller.
//!
//! Environment:
//!
//! - `QUEUE_CONTROLLER_DB_PATH`: RocksDB store location, needs the `rocksdb`
//!   feature; in-memory when unset
//! - `QUEUE_CONTROLLER_RESYNC_SECS`, `QUEUE_CONTROLLER_RETRY_BASE_MS`,
//!   `QUEUE_CONTROLLER_RETRY_MAX_MS`: see `ControllerConfig`
//! - `RUST_LOG`: log filter, `info` by default

use std::error::Error;
use std::sync::Arc;

use db::DbConfig;
use db::repositories::QueueRepository;
use queue_controller::{
    BroadcastRecorder, ControllerConfig, QueueReconciler, SupervisorArgs, SupervisorMessage,
    SurrealGroupIndex, SurrealQueueStore, start_supervisor,
};
use queue_core::Queue;
use tracing_subscriber::EnvFilter;

const DB_PATH_ENV: &str = "QUEUE_CONTROLLER_DB_PATH";
const DEFAULT_QUEUE: &str = "default";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ControllerConfig::from_env();

    let db_path = std::env::var(DB_PATH_ENV).ok().filter(|p| !p.is_empty());
    let db_config = match store_config(db_path) {
        Ok(db_config) => db_config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Opening store at {}", db_config.endpoint);
    db::init(db_config).await?;

    // A fresh store always carries the default queue.
    if !QueueRepository::exists(DEFAULT_QUEUE).await? {
        tracing::info!("Creating {} queue", DEFAULT_QUEUE);
        QueueRepository::create(&Queue::new(DEFAULT_QUEUE)).await?;
    }

    let recorder = BroadcastRecorder::new(config.event_capacity);
    let events = recorder.sender();
    let reconciler = QueueReconciler::new(SurrealQueueStore, SurrealGroupIndex, recorder);

    let (supervisor, handle) = start_supervisor(SupervisorArgs {
        reconciler: Arc::new(reconciler),
        config,
        events: Some(events),
    })
    .await?;

    supervisor.send_message(SupervisorMessage::Resync)?;
    tracing::info!("Queue controller running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, stopping");

    supervisor.send_message(SupervisorMessage::Shutdown)?;
    handle.await?;
    Ok(())
}

/// Pick the store backend for an optional on-disk path.
fn store_config(path: Option<String>) -> Result<DbConfig, String> {
    match path {
        None => Ok(DbConfig::memory()),
        #[cfg(feature = "rocksdb")]
        Some(path) => Ok(DbConfig::rocksdb(path)),
        #[cfg(not(feature = "rocksdb"))]
        Some(path) => Err(format!(
            "{} is set to {} but this build has no on-disk store; rebuild with --features rocksdb",
            DB_PATH_ENV, path
        )),
    }
}
