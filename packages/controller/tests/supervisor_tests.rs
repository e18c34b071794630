mod common;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use common::{FakeStore, FlakyIndex, RecordingRecorder, group};
use queue_controller::{
    ActorRef, ControllerConfig, GroupCache, QueueReconciler, SupervisorArgs, SupervisorMessage,
    start_supervisor,
};
use queue_core::{
    DesiredState, EventType, GroupPhase, LifecycleState, Queue, QueueAction, QueueCounts,
    QueueStatus,
};
use ractor::call_t;

fn test_config() -> ControllerConfig {
    ControllerConfig::default()
        .with_resync_interval(Duration::from_secs(3600))
        .with_retry_delays(Duration::from_millis(5), Duration::from_millis(20))
}

async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

async fn shutdown(
    supervisor: ActorRef<SupervisorMessage>,
    handle: tokio::task::JoinHandle<()>,
) -> Result<(), Box<dyn Error>> {
    supervisor.send_message(SupervisorMessage::Shutdown)?;
    tokio::time::timeout(Duration::from_secs(5), handle).await??;
    Ok(())
}

#[tokio::test]
async fn reconcile_closes_queue_through_worker() -> Result<(), Box<dyn Error>> {
    let store = Arc::new(FakeStore::with_queues([Queue::new("q1").with_status(
        QueueStatus::new(LifecycleState::Open, QueueCounts::default()),
    )]));
    let recorder = Arc::new(RecordingRecorder::default());
    let index = Arc::new(GroupCache::from_groups([group(
        "ns",
        "pg1",
        "q1",
        GroupPhase::Running,
    )]));
    let reconciler = QueueReconciler::new(store.clone(), index.clone(), recorder.clone());

    let (supervisor, handle) = start_supervisor(SupervisorArgs {
        reconciler: Arc::new(reconciler),
        config: test_config(),
        events: None,
    })
    .await?;

    supervisor.send_message(SupervisorMessage::Reconcile {
        name: "q1".into(),
        action: QueueAction::CloseQueue,
    })?;

    assert!(wait_until(|| store.snapshot("q1").status.state == LifecycleState::Closing).await);
    assert_eq!(store.snapshot("q1").spec.desired_state, DesiredState::Closed);

    let workers = call_t!(supervisor, |reply| SupervisorMessage::ListWorkers { reply }, 1000)?;
    assert_eq!(workers, vec!["q1".to_string()]);

    // The last group finishes; a resync drains the queue.
    index.upsert(group("ns", "pg1", "q1", GroupPhase::Completed));
    supervisor.send_message(SupervisorMessage::Resync)?;
    assert!(wait_until(|| store.snapshot("q1").status.state == LifecycleState::Closed).await);

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Normal);

    shutdown(supervisor, handle).await
}

#[tokio::test]
async fn failed_reconcile_is_retried() -> Result<(), Box<dyn Error>> {
    let store = Arc::new(FakeStore::with_queues([Queue::new("q1")]));
    let recorder = Arc::new(RecordingRecorder::default());
    let index = GroupCache::from_groups([
        group("ns", "pg1", "q1", GroupPhase::Pending),
        group("ns", "pg2", "q1", GroupPhase::Inqueue),
    ]);
    let reconciler = QueueReconciler::new(store.clone(), index, recorder.clone());
    store.fail_status_writes(3);

    let (supervisor, handle) = start_supervisor(SupervisorArgs {
        reconciler: Arc::new(reconciler),
        config: test_config(),
        events: None,
    })
    .await?;

    supervisor.send_message(SupervisorMessage::Reconcile {
        name: "q1".into(),
        action: QueueAction::SyncQueue,
    })?;

    assert!(wait_until(|| !store.status_writes().is_empty()).await);
    let stored = store.snapshot("q1");
    assert_eq!(stored.status.state, LifecycleState::Open);
    assert_eq!(stored.status.counts.pending, 1);
    assert_eq!(stored.status.counts.inqueue, 1);
    assert_eq!(store.status_writes().len(), 1);

    shutdown(supervisor, handle).await
}

#[tokio::test]
async fn unknown_queue_is_dropped() -> Result<(), Box<dyn Error>> {
    let store = Arc::new(FakeStore::default());
    let recorder = Arc::new(RecordingRecorder::default());
    let reconciler = QueueReconciler::new(store.clone(), GroupCache::new(), recorder.clone());

    let (supervisor, handle) = start_supervisor(SupervisorArgs {
        reconciler: Arc::new(reconciler),
        config: test_config(),
        events: None,
    })
    .await?;

    supervisor.send_message(SupervisorMessage::Reconcile {
        name: "ghost".into(),
        action: QueueAction::OpenQueue,
    })?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.writes().is_empty());
    assert!(recorder.events().is_empty());

    shutdown(supervisor, handle).await
}

#[tokio::test]
async fn resync_spawns_one_worker_per_queue() -> Result<(), Box<dyn Error>> {
    let store = Arc::new(FakeStore::with_queues([
        Queue::new("alpha"),
        Queue::new("beta"),
        Queue::new("gamma").with_desired_state(DesiredState::Closed),
    ]));
    let recorder = Arc::new(RecordingRecorder::default());
    let reconciler = QueueReconciler::new(store.clone(), GroupCache::new(), recorder.clone());

    let (supervisor, handle) = start_supervisor(SupervisorArgs {
        reconciler: Arc::new(reconciler),
        config: test_config(),
        events: None,
    })
    .await?;

    supervisor.send_message(SupervisorMessage::Resync)?;

    assert!(wait_until(|| store.status_writes().len() == 3).await);
    assert_eq!(store.snapshot("alpha").status.state, LifecycleState::Open);
    assert_eq!(store.snapshot("gamma").status.state, LifecycleState::Closed);

    let workers = call_t!(supervisor, |reply| SupervisorMessage::ListWorkers { reply }, 1000)?;
    assert_eq!(workers, vec!["alpha", "beta", "gamma"]);

    shutdown(supervisor, handle).await
}

#[tokio::test]
async fn missing_group_is_retried_not_dropped() -> Result<(), Box<dyn Error>> {
    let store = Arc::new(FakeStore::with_queues([Queue::new("q1")]));
    let recorder = Arc::new(RecordingRecorder::default());
    let index = Arc::new(FlakyIndex::new(
        GroupCache::from_groups([group("ns", "pg1", "q1", GroupPhase::Running)]),
        1,
    ));
    let reconciler = QueueReconciler::new(store.clone(), index.clone(), recorder.clone());

    let (supervisor, handle) = start_supervisor(SupervisorArgs {
        reconciler: Arc::new(reconciler),
        config: test_config(),
        events: None,
    })
    .await?;

    supervisor.send_message(SupervisorMessage::Reconcile {
        name: "q1".into(),
        action: QueueAction::SyncQueue,
    })?;

    assert!(wait_until(|| !store.status_writes().is_empty()).await);
    assert_eq!(index.resolves(), 2);
    assert_eq!(store.snapshot("q1").status.counts.running, 1);

    shutdown(supervisor, handle).await
}

#[tokio::test]
async fn repeated_failures_share_one_retry() -> Result<(), Box<dyn Error>> {
    let store = Arc::new(FakeStore::with_queues([Queue::new("q1")]));
    let recorder = Arc::new(RecordingRecorder::default());
    let index = GroupCache::from_groups([group("ns", "pg1", "q1", GroupPhase::Pending)]);
    let reconciler = QueueReconciler::new(store.clone(), index, recorder.clone());
    store.fail_status_writes(u32::MAX);

    let config = ControllerConfig::default()
        .with_resync_interval(Duration::from_secs(3600))
        .with_retry_delays(Duration::from_millis(20), Duration::from_millis(20));
    let (supervisor, handle) = start_supervisor(SupervisorArgs {
        reconciler: Arc::new(reconciler),
        config,
        events: None,
    })
    .await?;

    for _ in 0..5 {
        supervisor.send_message(SupervisorMessage::Resync)?;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // One retry chain at 20ms gives roughly 15 attempts in this window;
    // five independent chains would give about 75.
    let before = store.status_attempts();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let during = store.status_attempts() - before;
    assert!(during >= 3, "retries stopped: {} attempts", during);
    assert!(during <= 30, "retries multiplied: {} attempts", during);

    shutdown(supervisor, handle).await
}
