//! SurrealDB integration for the queue lifecycle controller.
//!
//! This crate is the durable resource store: it persists queues and the
//! workload groups bound to them.
//!
//! # Features
//!
//! - `memory` (default): `mem://` endpoints only
//! - `rocksdb`: enables `file://` and `rocksdb://` endpoints

mod connection;
mod schema;
pub mod repositories;

pub use connection::{Credentials, Database, DbConfig, DbError, Endpoint, get_db, init_db};
pub use schema::init_schema;

/// Connect to the store and apply the schema. Safe to call more than once;
/// only the first call connects.
pub async fn init(config: DbConfig) -> Result<(), DbError> {
    init_db(config).await?;
    init_schema().await?;
    Ok(())
}
