#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use db::DbError;
use queue_controller::{EventRecorder, GroupCache, GroupIndex, QueueStore};
use queue_core::{
    EventType, GroupPhase, Queue, QueueAction, QueueEvent, WorkloadGroup, WorkloadGroupKey,
};

/// A write observed by [`FakeStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Spec(Queue),
    Status(Queue),
}

/// In-memory queue store that records every accepted write and can be told
/// to fail the next few spec or status writes.
#[derive(Debug, Default)]
pub struct FakeStore {
    queues: Mutex<HashMap<String, Queue>>,
    writes: Mutex<Vec<Write>>,
    spec_failures: AtomicU32,
    status_failures: AtomicU32,
    status_attempts: AtomicU32,
    vanish_after_spec: AtomicBool,
}

impl FakeStore {
    pub fn with_queues(queues: impl IntoIterator<Item = Queue>) -> Self {
        let store = Self::default();
        for mut queue in queues {
            queue.resource_version = 1;
            store
                .queues
                .lock()
                .unwrap()
                .insert(queue.name.clone(), queue);
        }
        store
    }

    pub fn fail_spec_writes(&self, times: u32) {
        self.spec_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_status_writes(&self, times: u32) {
        self.status_failures.store(times, Ordering::SeqCst);
    }

    /// Delete the queue right after its next successful spec write.
    pub fn vanish_after_spec_write(&self) {
        self.vanish_after_spec.store(true, Ordering::SeqCst);
    }

    /// Status writes tried so far, failed ones included.
    pub fn status_attempts(&self) -> u32 {
        self.status_attempts.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn status_writes(&self) -> Vec<Queue> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                Write::Status(q) => Some(q),
                Write::Spec(_) => None,
            })
            .collect()
    }

    pub fn snapshot(&self, name: &str) -> Queue {
        self.queues.lock().unwrap()[name].clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn write(&self, queue: &Queue, apply: impl FnOnce(&mut Queue)) -> Result<Queue, DbError> {
        let mut queues = self.queues.lock().unwrap();
        let stored = queues
            .get_mut(&queue.name)
            .ok_or_else(|| DbError::NotFound(format!("Queue not found: {}", queue.name)))?;

        if stored.resource_version != queue.resource_version {
            return Err(DbError::Conflict(format!(
                "Queue {} was modified concurrently",
                queue.name
            )));
        }

        apply(stored);
        stored.resource_version += 1;
        Ok(stored.clone())
    }
}

impl QueueStore for FakeStore {
    async fn get(&self, name: &str) -> Result<Queue, DbError> {
        self.queues
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Queue not found: {}", name)))
    }

    async fn update_spec(&self, queue: &Queue) -> Result<Queue, DbError> {
        if Self::take_failure(&self.spec_failures) {
            return Err(DbError::Query("injected spec failure".into()));
        }
        let updated = self.write(queue, |stored| stored.spec = queue.spec.clone())?;
        self.writes.lock().unwrap().push(Write::Spec(updated.clone()));
        if self.vanish_after_spec.swap(false, Ordering::SeqCst) {
            self.queues.lock().unwrap().remove(&queue.name);
        }
        Ok(updated)
    }

    async fn update_status(&self, queue: &Queue) -> Result<Queue, DbError> {
        self.status_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.status_failures) {
            return Err(DbError::Query("injected status failure".into()));
        }
        let updated = self.write(queue, |stored| stored.status = queue.status)?;
        self.writes
            .lock()
            .unwrap()
            .push(Write::Status(updated.clone()));
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<Queue>, DbError> {
        let mut queues: Vec<Queue> = self.queues.lock().unwrap().values().cloned().collect();
        queues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(queues)
    }
}

/// Group index serving a fixed key listing, so tests can bind keys that do
/// not parse or do not resolve.
#[derive(Debug, Default)]
pub struct ScriptedIndex {
    pub keys: HashMap<String, Vec<String>>,
    pub groups: HashMap<WorkloadGroupKey, WorkloadGroup>,
}

impl ScriptedIndex {
    pub fn bind_raw(mut self, queue: &str, key: &str) -> Self {
        self.keys
            .entry(queue.to_string())
            .or_default()
            .push(key.to_string());
        self
    }

    pub fn bind(self, group: WorkloadGroup) -> Self {
        let queue = group.queue.clone();
        let raw = group.key.to_string();
        let mut index = self.bind_raw(&queue, &raw);
        index.groups.insert(group.key.clone(), group);
        index
    }
}

impl GroupIndex for ScriptedIndex {
    async fn list_bound_group_keys(&self, queue: &str) -> Result<Vec<String>, DbError> {
        Ok(self.keys.get(queue).cloned().unwrap_or_default())
    }

    async fn resolve_group(&self, key: &WorkloadGroupKey) -> Result<WorkloadGroup, DbError> {
        self.groups
            .get(key)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Workload group not found: {}", key)))
    }
}

/// Index over a [`GroupCache`] whose first few resolves report the group
/// as missing.
#[derive(Debug, Default)]
pub struct FlakyIndex {
    pub cache: GroupCache,
    misses: AtomicU32,
    resolves: AtomicU32,
}

impl FlakyIndex {
    pub fn new(cache: GroupCache, misses: u32) -> Self {
        Self {
            cache,
            misses: AtomicU32::new(misses),
            resolves: AtomicU32::new(0),
        }
    }

    pub fn resolves(&self) -> u32 {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl GroupIndex for FlakyIndex {
    async fn list_bound_group_keys(&self, queue: &str) -> Result<Vec<String>, DbError> {
        self.cache.list_bound_group_keys(queue).await
    }

    async fn resolve_group(&self, key: &WorkloadGroupKey) -> Result<WorkloadGroup, DbError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if FakeStore::take_failure(&self.misses) {
            return Err(DbError::NotFound(format!("Workload group not found: {}", key)));
        }
        self.cache.resolve_group(key).await
    }
}

/// Recorder that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingRecorder {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingRecorder {
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventRecorder for RecordingRecorder {
    fn record(&self, queue: &Queue, event_type: EventType, reason: QueueAction, message: String) {
        self.events
            .lock()
            .unwrap()
            .push(QueueEvent::new(queue.name.clone(), event_type, reason, message));
    }
}

pub fn group(namespace: &str, name: &str, queue: &str, phase: GroupPhase) -> WorkloadGroup {
    WorkloadGroup::new(WorkloadGroupKey::new(namespace, name), queue).with_phase(phase)
}
