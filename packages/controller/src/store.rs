//! Collaborator interfaces consumed by the reconcile actions, and the
//! implementations backed by the `db` crate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use db::DbError;
use db::repositories::{QueueRepository, WorkloadGroupRepository};
use queue_core::{Queue, WorkloadGroup, WorkloadGroupKey};

/// Durable queue store with whole-object replace semantics.
pub trait QueueStore: Send + Sync + 'static {
    /// Fetch a queue by name.
    fn get(&self, name: &str) -> impl Future<Output = Result<Queue, DbError>> + Send;

    /// Persist `queue.spec`; the stored status is not touched.
    fn update_spec(&self, queue: &Queue) -> impl Future<Output = Result<Queue, DbError>> + Send;

    /// Persist `queue.status`; the stored spec is not touched.
    fn update_status(&self, queue: &Queue)
    -> impl Future<Output = Result<Queue, DbError>> + Send;

    /// List every stored queue.
    fn list(&self) -> impl Future<Output = Result<Vec<Queue>, DbError>> + Send;
}

/// Read-through index of workload groups.
pub trait GroupIndex: Send + Sync + 'static {
    /// Keys (`namespace/name`) of the groups bound to `queue`.
    fn list_bound_group_keys(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    /// Resolve a key to the group it names.
    fn resolve_group(
        &self,
        key: &WorkloadGroupKey,
    ) -> impl Future<Output = Result<WorkloadGroup, DbError>> + Send;
}

impl<T: QueueStore> QueueStore for Arc<T> {
    fn get(&self, name: &str) -> impl Future<Output = Result<Queue, DbError>> + Send {
        (**self).get(name)
    }

    fn update_spec(&self, queue: &Queue) -> impl Future<Output = Result<Queue, DbError>> + Send {
        (**self).update_spec(queue)
    }

    fn update_status(
        &self,
        queue: &Queue,
    ) -> impl Future<Output = Result<Queue, DbError>> + Send {
        (**self).update_status(queue)
    }

    fn list(&self) -> impl Future<Output = Result<Vec<Queue>, DbError>> + Send {
        (**self).list()
    }
}

impl<T: GroupIndex> GroupIndex for Arc<T> {
    fn list_bound_group_keys(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<Vec<String>, DbError>> + Send {
        (**self).list_bound_group_keys(queue)
    }

    fn resolve_group(
        &self,
        key: &WorkloadGroupKey,
    ) -> impl Future<Output = Result<WorkloadGroup, DbError>> + Send {
        (**self).resolve_group(key)
    }
}

/// [`QueueStore`] backed by [`QueueRepository`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SurrealQueueStore;

impl QueueStore for SurrealQueueStore {
    async fn get(&self, name: &str) -> Result<Queue, DbError> {
        QueueRepository::get(name).await
    }

    async fn update_spec(&self, queue: &Queue) -> Result<Queue, DbError> {
        QueueRepository::update(queue).await
    }

    async fn update_status(&self, queue: &Queue) -> Result<Queue, DbError> {
        QueueRepository::update_status(queue).await
    }

    async fn list(&self) -> Result<Vec<Queue>, DbError> {
        QueueRepository::list().await
    }
}

/// [`GroupIndex`] that reads straight from [`WorkloadGroupRepository`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SurrealGroupIndex;

impl GroupIndex for SurrealGroupIndex {
    async fn list_bound_group_keys(&self, queue: &str) -> Result<Vec<String>, DbError> {
        WorkloadGroupRepository::list_keys_for_queue(queue).await
    }

    async fn resolve_group(&self, key: &WorkloadGroupKey) -> Result<WorkloadGroup, DbError> {
        WorkloadGroupRepository::get(key).await
    }
}

/// In-memory snapshot of workload groups, kept current by whoever observes
/// group changes.
#[derive(Debug, Default)]
pub struct GroupCache {
    groups: RwLock<HashMap<WorkloadGroupKey, WorkloadGroup>>,
}

impl GroupCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding `groups`.
    pub fn from_groups(groups: impl IntoIterator<Item = WorkloadGroup>) -> Self {
        let cache = Self::new();
        for group in groups {
            cache.upsert(group);
        }
        cache
    }

    /// Insert or replace a group.
    pub fn upsert(&self, group: WorkloadGroup) {
        self.groups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(group.key.clone(), group);
    }

    fn keys_for(&self, queue: &str) -> Vec<WorkloadGroupKey> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<WorkloadGroupKey> = groups
            .values()
            .filter(|g| g.queue == queue)
            .map(|g| g.key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn lookup(&self, key: &WorkloadGroupKey) -> Option<WorkloadGroup> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl GroupIndex for GroupCache {
    async fn list_bound_group_keys(&self, queue: &str) -> Result<Vec<String>, DbError> {
        Ok(self
            .keys_for(queue)
            .into_iter()
            .map(|key| key.to_string())
            .collect())
    }

    async fn resolve_group(&self, key: &WorkloadGroupKey) -> Result<WorkloadGroup, DbError> {
        self.lookup(key)
            .ok_or_else(|| DbError::NotFound(format!("Workload group not found: {}", key)))
    }
}
