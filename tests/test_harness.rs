//! Shared doubles for integration tests: in-memory connections, scripted
//! connectors, recording behaviors, and bus helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time;

use botvisor::{
    Behavior, Config, Connection, ConnectionError, Connector, Event, EventKind, JobContext,
    JobError, JobRequest,
};

/// Small config tuned for tests: short backoff, small retry budget.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.max_retries = 3;
    cfg.grace = Duration::from_secs(5);
    cfg
}

/// In-memory connection; records sent frames, replies with `b"ok"`.
pub struct MemoryConnection {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send(&mut self, frame: &[u8]) -> Result<(), ConnectionError> {
        self.sent
            .lock()
            .expect("sent frames lock poisoned")
            .push(frame.to_vec());
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, ConnectionError> {
        Ok(b"ok".to_vec())
    }

    async fn close(&mut self) {}
}

/// Connector that fails transiently a set number of times before connecting.
pub struct FlakyConnector {
    endpoint: String,
    failures_left: AtomicU32,
    pub attempts: AtomicUsize,
    pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FlakyConnector {
    pub fn new(fail_first: u32) -> Arc<Self> {
        Arc::new(Self {
            endpoint: "mem://device-1".to_string(),
            failures_left: AtomicU32::new(fail_first),
            attempts: AtomicUsize::new(0),
            sent: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn reliable() -> Arc<Self> {
        Self::new(0)
    }

    /// Makes every future connect attempt fail transiently.
    pub fn break_permanently(&self) {
        self.failures_left.store(u32::MAX, Ordering::SeqCst);
    }

    /// Lets connect attempts succeed again.
    pub fn repair(&self) {
        self.failures_left.store(0, Ordering::SeqCst);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FlakyConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != u32::MAX {
                self.failures_left.store(left - 1, Ordering::SeqCst);
            }
            return Err(ConnectionError::transient("simulated connect refusal"));
        }
        Ok(Box::new(MemoryConnection {
            sent: Arc::clone(&self.sent),
        }))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Connector that always fails fatally (bad credentials style).
pub struct RejectingConnector;

#[async_trait]
impl Connector for RejectingConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        Err(ConnectionError::fatal("authentication rejected"))
    }

    fn endpoint(&self) -> &str {
        "mem://rejecting"
    }
}

/// Echoes the payload through the connection and returns the reply.
pub struct EchoBehavior;

#[async_trait]
impl Behavior for EchoBehavior {
    async fn execute(
        &self,
        job: &JobRequest,
        conn: &mut dyn Connection,
        _ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        conn.send(&job.payload).await?;
        Ok(Some(conn.receive().await?))
    }
}

/// Records which worker ran which job, with an optional busy period.
pub struct RecordingBehavior {
    pub runs: Arc<Mutex<Vec<(botvisor::JobId, String)>>>,
    pub busy: Duration,
}

impl RecordingBehavior {
    pub fn new(busy: Duration) -> Arc<Self> {
        Arc::new(Self {
            runs: Arc::new(Mutex::new(Vec::new())),
            busy,
        })
    }
}

#[async_trait]
impl Behavior for RecordingBehavior {
    async fn execute(
        &self,
        job: &JobRequest,
        _conn: &mut dyn Connection,
        ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        self.runs
            .lock()
            .expect("runs lock poisoned")
            .push((job.id, ctx.worker().to_string()));
        if !self.busy.is_zero() {
            time::sleep(self.busy).await;
        }
        Ok(None)
    }
}

/// Fails with a transient connection loss the first `n` executions.
pub struct LossyBehavior {
    failures_left: AtomicU32,
}

impl LossyBehavior {
    pub fn new(n: u32) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicU32::new(n),
        })
    }
}

#[async_trait]
impl Behavior for LossyBehavior {
    async fn execute(
        &self,
        _job: &JobRequest,
        _conn: &mut dyn Connection,
        _ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(JobError::Connection(ConnectionError::transient(
                "link dropped mid-frame",
            )));
        }
        Ok(Some(b"done".to_vec()))
    }
}

/// Always fails with an ordinary (non-connection) behavior error.
pub struct FailingBehavior;

#[async_trait]
impl Behavior for FailingBehavior {
    async fn execute(
        &self,
        _job: &JobRequest,
        _conn: &mut dyn Connection,
        _ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        Err(JobError::Fail {
            reason: "device rejected the command".to_string(),
        })
    }
}

/// Runs until cancelled, then reports cooperative cancellation.
pub struct BlockingBehavior;

#[async_trait]
impl Behavior for BlockingBehavior {
    async fn execute(
        &self,
        _job: &JobRequest,
        _conn: &mut dyn Connection,
        ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        ctx.cancelled().await;
        Err(JobError::Canceled)
    }
}

/// Sleeps for a fixed period, ignoring cancellation (for deadline tests).
pub struct SlowBehavior(pub Duration);

#[async_trait]
impl Behavior for SlowBehavior {
    async fn execute(
        &self,
        _job: &JobRequest,
        _conn: &mut dyn Connection,
        _ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        time::sleep(self.0).await;
        Ok(None)
    }
}

/// Waits for the next event of `kind` on a bus receiver, collecting along
/// the way. Panics (failing the test) if it does not arrive in `within`.
pub async fn wait_for_kind(
    rx: &mut broadcast::Receiver<Event>,
    kind: EventKind,
    within: Duration,
) -> Event {
    let deadline = time::Instant::now() + within;
    loop {
        let remaining = deadline.saturating_duration_since(time::Instant::now());
        match time::timeout(remaining, rx.recv()).await {
            Ok(Ok(ev)) if ev.kind == kind => return ev,
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => panic!("bus closed while waiting for {kind:?}: {e}"),
            Err(_) => panic!("timed out waiting for {kind:?}"),
        }
    }
}

/// Drains every event currently buffered on the receiver.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}
