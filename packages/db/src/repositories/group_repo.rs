//! Workload group repository.

use chrono::{DateTime, Utc};
use queue_core::{GroupId, GroupPhase, WorkloadGroup, WorkloadGroupKey};
use serde::{Deserialize, Serialize};

use crate::{DbError, get_db};

/// Repository for workload group persistence operations.
pub struct WorkloadGroupRepository;

/// Internal record type for SurrealDB reads.
#[derive(Debug, Deserialize)]
struct GroupRecord {
    key: WorkloadGroupKey,
    uid: GroupId,
    queue: String,
    phase: GroupPhase,
    min_member: u32,
    created_at: DateTime<Utc>,
}

impl GroupRecord {
    fn into_group(self) -> WorkloadGroup {
        WorkloadGroup {
            key: self.key,
            uid: self.uid,
            queue: self.queue,
            phase: self.phase,
            min_member: self.min_member,
            created_at: self.created_at,
        }
    }
}

/// Struct for creating groups - omits `created_at` to use the SurrealDB default.
#[derive(Debug, Clone, Serialize)]
struct GroupCreate {
    key: WorkloadGroupKey,
    uid: GroupId,
    queue: String,
    phase: GroupPhase,
    min_member: u32,
}

/// Only the key is projected when listing the groups bound to a queue.
#[derive(Debug, Deserialize)]
struct KeyRow {
    key: WorkloadGroupKey,
}

impl WorkloadGroupRepository {
    /// Create a new workload group in the database.
    pub async fn create(group: &WorkloadGroup) -> Result<WorkloadGroup, DbError> {
        let db = get_db()?;

        let create_data = GroupCreate {
            key: group.key.clone(),
            uid: group.uid,
            queue: group.queue.clone(),
            phase: group.phase,
            min_member: group.min_member,
        };

        let record: Option<GroupRecord> = db
            .create(("workload_group", group.key.to_string()))
            .content(create_data)
            .await?;

        record
            .map(GroupRecord::into_group)
            .ok_or_else(|| DbError::Query("Failed to create workload group".into()))
    }

    /// Get a workload group by key.
    pub async fn get(key: &WorkloadGroupKey) -> Result<WorkloadGroup, DbError> {
        let db = get_db()?;

        let record: Option<GroupRecord> = db.select(("workload_group", key.to_string())).await?;

        record
            .map(GroupRecord::into_group)
            .ok_or_else(|| DbError::NotFound(format!("Workload group not found: {}", key)))
    }

    /// List the keys of all groups bound to a queue, rendered as `namespace/name`
    /// and sorted.
    pub async fn list_keys_for_queue(queue: &str) -> Result<Vec<String>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("SELECT key FROM workload_group WHERE queue = $queue")
            .bind(("queue", queue.to_string()))
            .await?;

        let mut rows: Vec<KeyRow> = result.take(0)?;
        rows.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(rows.into_iter().map(|row| row.key.to_string()).collect())
    }

    /// Update a group's phase.
    pub async fn update_phase(
        key: &WorkloadGroupKey,
        phase: GroupPhase,
    ) -> Result<WorkloadGroup, DbError> {
        let db = get_db()?;

        let record: Option<GroupRecord> = db
            .update(("workload_group", key.to_string()))
            .merge(serde_json::json!({ "phase": phase }))
            .await?;

        record
            .map(GroupRecord::into_group)
            .ok_or_else(|| DbError::NotFound(format!("Workload group not found: {}", key)))
    }

    /// Delete a workload group.
    pub async fn delete(key: &WorkloadGroupKey) -> Result<(), DbError> {
        let db = get_db()?;

        let _: Option<GroupRecord> = db.delete(("workload_group", key.to_string())).await?;

        Ok(())
    }
}
