//! # Demo: device job pipeline
//!
//! Two workers on in-memory "devices", a handful of jobs across tiers and
//! owners, and a log subscriber showing the lifecycle. Run with:
//!
//! ```sh
//! cargo run --example pipeline
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use botvisor::{
    Behavior, BehaviorRegistry, Config, Connection, ConnectionError, Connector, JobContext,
    JobError, JobRequest, LogWriter, Pool, Subscribe,
};

/// In-memory device: accepts frames and acknowledges them.
struct MemoryDevice {
    name: &'static str,
}

#[async_trait]
impl Connection for MemoryDevice {
    async fn send(&mut self, frame: &[u8]) -> Result<(), ConnectionError> {
        println!("[{}] <- {} byte(s)", self.name, frame.len());
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, ConnectionError> {
        Ok(b"ack".to_vec())
    }

    async fn close(&mut self) {
        println!("[{}] closed", self.name);
    }
}

struct MemoryConnector {
    name: &'static str,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        Ok(Box::new(MemoryDevice { name: self.name }))
    }

    fn endpoint(&self) -> &str {
        self.name
    }
}

/// Sends the payload to the device, reports progress, reads the ack.
struct Dispatch;

#[async_trait]
impl Behavior for Dispatch {
    async fn execute(
        &self,
        job: &JobRequest,
        conn: &mut dyn Connection,
        ctx: &JobContext,
    ) -> Result<Option<Vec<u8>>, JobError> {
        conn.send(&job.payload).await?;
        ctx.progress("frame sent");
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(Some(conn.receive().await?))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut cfg = Config::default();
    cfg.owner_cap = 2;
    cfg.grace = Duration::from_secs(5);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let pool = Pool::builder(cfg)
        .behaviors(BehaviorRegistry::new().register("dispatch", Arc::new(Dispatch)))
        .subscribers(subs)
        .build();

    pool.spawn_worker("bot-1", Arc::new(MemoryConnector { name: "mem://dev-1" }))
        .await?;
    pool.spawn_worker("bot-2", Arc::new(MemoryConnector { name: "mem://dev-2" }))
        .await?;

    // Mixed tiers: the tier-2 job jumps the line even though it is last in.
    for (owner, tier, frame) in [
        ("alice", 0u8, &b"calibrate"[..]),
        ("bob", 1, b"move-arm"),
        ("carol", 0, b"read-sensors"),
        ("dave", 2, b"emergency-stop"),
    ] {
        let job = JobRequest::new(owner, "dispatch", frame.to_vec()).with_tier(tier);
        let position = pool.submit(job).await?;
        println!("[producer] {owner} queued at position {position}");
    }

    // Let the pipeline drain, then shut down.
    tokio::time::sleep(Duration::from_secs(2)).await;
    for w in pool.list_workers().await {
        println!("[admin] {} is {:?}", w.id, w.state);
    }
    pool.shutdown(true).await?;
    Ok(())
}
