//! # Demo: flaky device with supervised reconnects
//!
//! A device that refuses the first few connections and drops the link
//! mid-job. Watch the `BackoffScheduled` / `ConnectionRestored` events and
//! the job resuming afterwards. Run with:
//!
//! ```sh
//! cargo run --example flaky_device
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use botvisor::{
    BackoffPolicy, Behavior, BehaviorRegistry, Config, Connection, ConnectionError, Connector,
    JobContext, JobError, JobRequest, LogWriter, Pool, Subscribe,
};

/// Device link that dies after a couple of frames.
struct UnstableLink {
    frames_left: u32,
}

#[async_trait]
impl Connection for UnstableLink {
    async fn send(&mut self, _frame: &[u8]) -> Result<(), ConnectionError> {
        if self.frames_left == 0 {
            return Err(ConnectionError::transient("link dropped"));
        }
        self.frames_left -= 1;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, ConnectionError> {
        Ok(b"ack".to_vec())
    }

    async fn close(&mut self) {}
}

/// Refuses the first two connects; the first accepted link is short-lived,
/// every later one holds.
struct UnstableConnector {
    refusals_left: AtomicU32,
    links_given: AtomicU32,
}

#[async_trait]
impl Connector for UnstableConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        let left = self.refusals_left.load(Ordering::SeqCst);
        if left > 0 {
            self.refusals_left.store(left - 1, Ordering::SeqCst);
            return Err(ConnectionError::transient("device busy"));
        }
        let nth = self.links_given.fetch_add(1, Ordering::SeqCst);
        let frames_left = if nth == 0 { 2 } else { u32::MAX };
        Ok(Box::new(UnstableLink { frames_left }))
    }

    fn endpoint(&self) -> &str {
        "mem://flaky-device"
    }
}

/// Streams a handful of frames; survives link drops via the retry flag.
struct StreamFrames;

#[async_trait]
impl Behavior for StreamFrames {
    async fn execute(
        &self,
        job: &JobRequest,
        conn: &mut dyn Connection,
        ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        for i in 0..4u8 {
            if ctx.is_cancelled() {
                return Err(JobError::Canceled);
            }
            conn.send(&[i]).await?;
            ctx.progress(format!("frame {i} of 4"));
        }
        let _ = job;
        Ok(Some(conn.receive().await?))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut cfg = Config::default();
    cfg.backoff = BackoffPolicy {
        first: Duration::from_millis(200),
        max: Duration::from_secs(2),
        ..BackoffPolicy::default()
    };
    cfg.max_retries = 5;
    cfg.grace = Duration::from_secs(5);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let pool = Pool::builder(cfg)
        .behaviors(BehaviorRegistry::new().register("stream", Arc::new(StreamFrames)))
        .subscribers(subs)
        .build();

    pool.spawn_worker(
        "bot-1",
        Arc::new(UnstableConnector {
            refusals_left: AtomicU32::new(2),
            links_given: AtomicU32::new(0),
        }),
    )
    .await?;

    // The first link dies two frames in; the job is re-run from the top
    // once the supervisor restores the connection.
    let job = JobRequest::new("alice", "stream", vec![]).with_deadline(Duration::from_secs(30));
    pool.submit(job).await?;

    tokio::time::sleep(Duration::from_secs(5)).await;
    pool.shutdown(true).await?;
    Ok(())
}
