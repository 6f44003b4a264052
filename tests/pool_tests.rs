//! Pool tests: end-to-end execution, admin surface, subscriber fan-out,
//! and the two shutdown modes.

mod test_harness;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use botvisor::{
    BehaviorRegistry, BotState, Event, EventKind, JobRequest, Pool, RegisterError, RuntimeError,
    StateError, Subscribe,
};
use test_harness::{
    test_config, wait_for_kind, BlockingBehavior, EchoBehavior, FlakyConnector, SlowBehavior,
};

/// Subscriber double that remembers everything it was handed.
struct CaptureSubscriber {
    seen: Mutex<Vec<Event>>,
}

impl CaptureSubscriber {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn kinds(&self) -> Vec<EventKind> {
        self.seen
            .lock()
            .expect("capture lock poisoned")
            .iter()
            .map(|e| e.kind)
            .collect()
    }
}

#[async_trait]
impl Subscribe for CaptureSubscriber {
    async fn on_event(&self, event: &Event) {
        self.seen
            .lock()
            .expect("capture lock poisoned")
            .push(event.clone());
    }

    fn name(&self) -> &'static str {
        "capture"
    }
}

async fn wait_for_state(pool: &Pool, worker: &str, state: BotState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        if let Some(summary) = pool.worker(worker).await {
            if summary.state == state {
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("worker '{worker}' never reached {state:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn echo_job_end_to_end() {
    let behaviors = BehaviorRegistry::new().register("echo", Arc::new(EchoBehavior));
    let pool = Pool::builder(test_config()).behaviors(behaviors).build();
    let mut rx = pool.bus().subscribe();

    let connector = FlakyConnector::reliable();
    pool.spawn_worker("bot-1", connector.clone()).await.unwrap();

    let job = JobRequest::new("alice", "echo", b"ping".to_vec());
    let id = job.id;
    let position = pool.submit(job).await.unwrap();
    assert_eq!(position, 1);

    let done = wait_for_kind(&mut rx, EventKind::Completed, Duration::from_secs(10)).await;
    assert_eq!(done.job, Some(id));

    let frames = connector.sent.lock().expect("frames lock poisoned").clone();
    assert_eq!(frames, vec![b"ping".to_vec()]);
    assert!(pool.list_queue().await.is_empty());
    wait_for_state(&pool, "bot-1", BotState::Idle).await;

    pool.shutdown(true).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn subscriber_receives_lifecycle_events() {
    let capture = CaptureSubscriber::new();
    let behaviors = BehaviorRegistry::new().register("echo", Arc::new(EchoBehavior));
    let pool = Pool::builder(test_config())
        .behaviors(behaviors)
        .subscriber(capture.clone())
        .build();
    let mut rx = pool.bus().subscribe();

    pool.spawn_worker("bot-1", FlakyConnector::reliable())
        .await
        .unwrap();
    pool.submit(JobRequest::new("alice", "echo", b"x".to_vec()))
        .await
        .unwrap();
    wait_for_kind(&mut rx, EventKind::Completed, Duration::from_secs(10)).await;

    // Fan-out is asynchronous; poll until the capture catches up.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let kinds = capture.kinds();
        if kinds.contains(&EventKind::Enqueued)
            && kinds.contains(&EventKind::Started)
            && kinds.contains(&EventKind::Completed)
        {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("capture never saw the full lifecycle: {kinds:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Enqueued must precede Started, which must precede Completed.
    let kinds = capture.kinds();
    let pos = |k: EventKind| kinds.iter().position(|x| *x == k);
    assert!(pos(EventKind::Enqueued) < pos(EventKind::Started));
    assert!(pos(EventKind::Started) < pos(EventKind::Completed));

    pool.shutdown(true).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn duplicate_worker_and_unknown_admin_ops() {
    let pool = Pool::builder(test_config()).build();

    pool.spawn_worker("bot-1", FlakyConnector::reliable())
        .await
        .unwrap();
    assert!(matches!(
        pool.spawn_worker("bot-1", FlakyConnector::reliable()).await,
        Err(RegisterError::DuplicateWorker { .. })
    ));

    assert!(matches!(
        pool.stop_worker("ghost", true).await,
        Err(StateError::UnknownWorker { .. })
    ));
    assert!(matches!(
        pool.reset_worker("ghost").await,
        Err(StateError::UnknownWorker { .. })
    ));
    // Resetting a healthy worker is a state conflict.
    assert!(matches!(
        pool.reset_worker("bot-1").await,
        Err(StateError::Conflict { .. })
    ));

    pool.shutdown(true).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_and_deregister_single_worker() {
    let pool = Pool::builder(test_config()).build();
    let mut rx = pool.bus().subscribe();

    pool.spawn_worker("bot-1", FlakyConnector::reliable())
        .await
        .unwrap();
    pool.spawn_worker("bot-2", FlakyConnector::reliable())
        .await
        .unwrap();

    pool.stop_worker("bot-1", true).await.unwrap();
    let stopped = wait_for_kind(&mut rx, EventKind::WorkerStopped, Duration::from_secs(10)).await;
    assert_eq!(stopped.worker.as_deref(), Some("bot-1"));
    wait_for_state(&pool, "bot-1", BotState::Stopped).await;

    // Still listed until deregistered.
    assert_eq!(pool.list_workers().await.len(), 2);
    pool.deregister("bot-1").await.unwrap();
    let remaining = pool.list_workers().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "bot-2");
    assert!(matches!(
        pool.deregister("bot-1").await,
        Err(StateError::UnknownWorker { .. })
    ));

    pool.shutdown(true).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn graceful_shutdown_lets_inflight_job_finish() {
    let behaviors =
        BehaviorRegistry::new().register("slow", Arc::new(SlowBehavior(Duration::from_secs(2))));
    let pool = Pool::builder(test_config()).behaviors(behaviors).build();
    let mut rx = pool.bus().subscribe();

    pool.spawn_worker("bot-1", FlakyConnector::reliable())
        .await
        .unwrap();
    let job = JobRequest::new("alice", "slow", vec![]);
    let id = job.id;
    pool.submit(job).await.unwrap();
    wait_for_kind(&mut rx, EventKind::Started, Duration::from_secs(10)).await;

    pool.shutdown(true).await.unwrap();

    let events = test_harness::drain(&mut rx);
    let done = events
        .iter()
        .find(|e| e.kind == EventKind::Completed && e.job == Some(id));
    assert!(done.is_some(), "in-flight job should finish under grace");
}

#[tokio::test(start_paused = true)]
async fn forced_shutdown_cancels_inflight_job() {
    let behaviors = BehaviorRegistry::new().register("block", Arc::new(BlockingBehavior));
    let pool = Pool::builder(test_config()).behaviors(behaviors).build();
    let mut rx = pool.bus().subscribe();

    pool.spawn_worker("bot-1", FlakyConnector::reliable())
        .await
        .unwrap();
    let job = JobRequest::new("alice", "block", vec![]);
    let id = job.id;
    pool.submit(job).await.unwrap();
    wait_for_kind(&mut rx, EventKind::Started, Duration::from_secs(10)).await;

    pool.shutdown(false).await.unwrap();

    let events = test_harness::drain(&mut rx);
    let cancelled = events
        .iter()
        .find(|e| e.kind == EventKind::Cancelled && e.job == Some(id));
    assert!(cancelled.is_some(), "forced stop must cancel the job");
}

#[tokio::test(start_paused = true)]
async fn grace_exceeded_when_worker_cannot_drain() {
    let mut cfg = test_config();
    cfg.grace = Duration::from_secs(5);
    let behaviors =
        BehaviorRegistry::new().register("stuck", Arc::new(SlowBehavior(Duration::from_secs(600))));
    let pool = Pool::builder(cfg).behaviors(behaviors).build();
    let mut rx = pool.bus().subscribe();

    pool.spawn_worker("bot-1", FlakyConnector::reliable())
        .await
        .unwrap();
    pool.submit(JobRequest::new("alice", "stuck", vec![]))
        .await
        .unwrap();
    wait_for_kind(&mut rx, EventKind::Started, Duration::from_secs(10)).await;

    let err = pool.shutdown(true).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::GraceExceeded { stuck: 1, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn no_registration_after_shutdown() {
    let pool = Pool::builder(test_config()).build();
    pool.shutdown(true).await.unwrap();

    assert!(matches!(
        pool.spawn_worker("bot-1", FlakyConnector::reliable()).await,
        Err(RegisterError::Shutdown)
    ));
}
