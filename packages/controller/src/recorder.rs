//! Event sink for user-visible reconcile outcomes.

use std::sync::Arc;

use queue_core::{EventType, Queue, QueueAction, QueueEvent};
use tokio::sync::broadcast;

/// Fire-and-forget sink for queue events.
pub trait EventRecorder: Send + Sync + 'static {
    fn record(&self, queue: &Queue, event_type: EventType, reason: QueueAction, message: String);
}

impl<T: EventRecorder> EventRecorder for Arc<T> {
    fn record(&self, queue: &Queue, event_type: EventType, reason: QueueAction, message: String) {
        (**self).record(queue, event_type, reason, message);
    }
}

/// Recorder that logs every event and broadcasts it to subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastRecorder {
    event_tx: broadcast::Sender<QueueEvent>,
}

impl BroadcastRecorder {
    /// Create a recorder whose channel buffers up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// Sender half, for forwarding into other subscribers.
    pub fn sender(&self) -> broadcast::Sender<QueueEvent> {
        self.event_tx.clone()
    }
}

impl EventRecorder for BroadcastRecorder {
    fn record(&self, queue: &Queue, event_type: EventType, reason: QueueAction, message: String) {
        let event = QueueEvent::new(queue.name.clone(), event_type, reason, message);

        match event_type {
            EventType::Normal => tracing::info!("{}", event.description()),
            EventType::Warning => tracing::warn!("{}", event.description()),
        }

        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}
