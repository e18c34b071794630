//! Queue repository: whole-object reads and version-checked writes.

use chrono::{DateTime, Utc};
use queue_core::{Queue, QueueId, QueueSpec, QueueStatus};
use serde::{Deserialize, Serialize};

use crate::{DbError, get_db};

/// Queue records, keyed by queue name.
pub struct QueueRepository;

/// Stored shape of a queue.
#[derive(Debug, Deserialize)]
struct QueueRecord {
    name: String,
    uid: QueueId,
    description: Option<String>,
    spec: QueueSpec,
    status: QueueStatus,
    resource_version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QueueRecord {
    fn into_queue(self) -> Queue {
        Queue {
            name: self.name,
            uid: self.uid,
            description: self.description,
            spec: self.spec,
            status: self.status,
            resource_version: self.resource_version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Struct for creating queues - omits datetime fields to use SurrealDB defaults.
#[derive(Debug, Clone, Serialize)]
struct QueueCreate {
    name: String,
    uid: QueueId,
    description: Option<String>,
    spec: QueueSpec,
    status: QueueStatus,
    resource_version: u64,
}

impl QueueRepository {
    /// Store a new queue at resource version 1.
    ///
    /// Fails if a queue with the same name already exists.
    pub async fn create(queue: &Queue) -> Result<Queue, DbError> {
        let db = get_db()?;

        let create_data = QueueCreate {
            name: queue.name.clone(),
            uid: queue.uid,
            description: queue.description.clone(),
            spec: queue.spec.clone(),
            status: queue.status,
            resource_version: 1,
        };

        let record: Option<QueueRecord> = db
            .create(("queue", queue.name.as_str()))
            .content(create_data)
            .await?;

        record
            .map(QueueRecord::into_queue)
            .ok_or_else(|| DbError::Query("Failed to create queue".into()))
    }

    /// Get a queue by name.
    pub async fn get(name: &str) -> Result<Queue, DbError> {
        let db = get_db()?;

        let record: Option<QueueRecord> = db.select(("queue", name)).await?;

        record
            .map(QueueRecord::into_queue)
            .ok_or_else(|| DbError::NotFound(format!("Queue not found: {}", name)))
    }

    /// List all queues ordered by name.
    pub async fn list() -> Result<Vec<Queue>, DbError> {
        let db = get_db()?;

        let mut result = db.query("SELECT * FROM queue ORDER BY name ASC").await?;
        let records: Vec<QueueRecord> = result.take(0)?;

        Ok(records.into_iter().map(QueueRecord::into_queue).collect())
    }

    /// Replace a queue's description and spec. The status is left untouched.
    ///
    /// Returns [`DbError::Conflict`] when the stored resource version differs
    /// from `queue.resource_version`.
    pub async fn update(queue: &Queue) -> Result<Queue, DbError> {
        let db = get_db()?;

        let mut result = db
            .query(
                "UPDATE type::thing('queue', $name) SET description = $description, spec = $spec, resource_version += 1, updated_at = time::now() WHERE resource_version = $version RETURN AFTER",
            )
            .bind(("name", queue.name.clone()))
            .bind(("description", queue.description.clone()))
            .bind(("spec", queue.spec.clone()))
            .bind(("version", queue.resource_version))
            .await?;

        let records: Vec<QueueRecord> = result.take(0)?;

        match records.into_iter().next() {
            Some(record) => Ok(record.into_queue()),
            None => Err(Self::write_rejected(queue).await),
        }
    }

    /// Replace a queue's status. `spec` is left untouched.
    ///
    /// Returns [`DbError::Conflict`] when the stored resource version differs
    /// from `queue.resource_version`.
    pub async fn update_status(queue: &Queue) -> Result<Queue, DbError> {
        let db = get_db()?;

        let mut result = db
            .query(
                "UPDATE type::thing('queue', $name) SET status = $status, resource_version += 1, updated_at = time::now() WHERE resource_version = $version RETURN AFTER",
            )
            .bind(("name", queue.name.clone()))
            .bind(("status", queue.status))
            .bind(("version", queue.resource_version))
            .await?;

        let records: Vec<QueueRecord> = result.take(0)?;

        match records.into_iter().next() {
            Some(record) => Ok(record.into_queue()),
            None => Err(Self::write_rejected(queue).await),
        }
    }

    /// Delete a queue.
    pub async fn delete(name: &str) -> Result<(), DbError> {
        let db = get_db()?;

        let _: Option<QueueRecord> = db.delete(("queue", name)).await?;

        Ok(())
    }

    /// Check if a queue exists.
    pub async fn exists(name: &str) -> Result<bool, DbError> {
        let db = get_db()?;

        let record: Option<QueueRecord> = db.select(("queue", name)).await?;

        Ok(record.is_some())
    }

    /// Explain why a conditional write matched no record.
    async fn write_rejected(queue: &Queue) -> DbError {
        match Self::exists(&queue.name).await {
            Ok(true) => DbError::Conflict(format!(
                "Queue {} was modified since resource version {}",
                queue.name, queue.resource_version
            )),
            Ok(false) => DbError::NotFound(format!("Queue not found: {}", queue.name)),
            Err(e) => e,
        }
    }
}
