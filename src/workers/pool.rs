//! # Pool: composition root and admin surface.
//!
//! The [`Pool`] owns the event bus, the queue manager, the behavior
//! registry, and one actor task per registered worker. Producers talk to it
//! (or directly to its [`QueueManager`]) to submit and cancel jobs; admins
//! use it to register, inspect, reset, and stop workers.
//!
//! ## Wiring
//! ```text
//! PoolBuilder::new(cfg)
//!   .behaviors(registry)
//!   .subscribers(vec![Arc::new(LogWriter::new())])
//!   .build()
//!       │
//!       ├─► Bus ──► pool listener ──► SubscriberSet::emit(&Event)
//!       ├─► QueueManager (admission + priority order + claims)
//!       └─► spawn_worker(id, connector) ──► BotActor::run(claim, force)
//!
//! Shutdown path:
//!   shutdown(graceful)
//!     ├─► QueueManager::shutdown()  (publishes ShutdownRequested once)
//!     ├─► claim tokens cancelled    (no new claims)
//!     ├─► forced? job/force tokens cancelled too
//!     └─► join workers within Config::grace, else GraceExceeded
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::select;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::connection::{ConnectionSupervisor, Connector};
use crate::error::{CancelError, RegisterError, RuntimeError, StateError, SubmitError};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{BehaviorRegistry, JobId, JobRequest};
use crate::policies::TierPolicy;
use crate::queue::{JobSummary, QueueManager};
use crate::shutdown;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workers::actor::BotActor;
use crate::workers::state::{BotState, WorkerRecord, WorkerSummary};

/// Everything the pool keeps per registered worker.
struct WorkerHandle {
    record: Arc<RwLock<WorkerRecord>>,
    endpoint: String,
    /// Stops claiming; in-flight work is allowed to finish.
    claim_token: CancellationToken,
    /// Cancels in-flight work and aborts reconnect waits.
    force_token: CancellationToken,
    /// Wakes the actor out of its `Error` parking after an admin reset.
    reset: Arc<Notify>,
    join: JoinHandle<()>,
}

/// Builder for a [`Pool`].
pub struct PoolBuilder {
    cfg: Config,
    behaviors: BehaviorRegistry,
    subscribers: Vec<Arc<dyn Subscribe>>,
    tier_policy: TierPolicy,
}

impl PoolBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            behaviors: BehaviorRegistry::new(),
            subscribers: Vec::new(),
            tier_policy: TierPolicy::default(),
        }
    }

    /// Sets the behavior registry jobs are dispatched through.
    pub fn behaviors(mut self, behaviors: BehaviorRegistry) -> Self {
        self.behaviors = behaviors;
        self
    }

    /// Adds one event subscriber.
    pub fn subscriber(mut self, sub: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(sub);
        self
    }

    /// Replaces the whole subscriber list.
    pub fn subscribers(mut self, subs: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subs;
        self
    }

    /// Overrides how submissions are mapped to priority tiers.
    pub fn tier_policy(mut self, policy: TierPolicy) -> Self {
        self.tier_policy = policy;
        self
    }

    /// Builds the pool and starts its event fan-out listener.
    pub fn build(self) -> Arc<Pool> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let queue = QueueManager::new(&self.cfg, self.tier_policy, bus.clone());

        let pool = Arc::new(Pool {
            cfg: self.cfg,
            bus,
            queue,
            behaviors: self.behaviors,
            subs,
            workers: RwLock::new(HashMap::new()),
            stop: CancellationToken::new(),
        });
        pool.spawn_listener();
        pool
    }
}

/// Owns the runtime: queue manager, worker actors, and event fan-out.
pub struct Pool {
    cfg: Config,
    bus: Bus,
    queue: Arc<QueueManager>,
    behaviors: BehaviorRegistry,
    subs: Arc<SubscriberSet>,
    workers: RwLock<HashMap<Arc<str>, WorkerHandle>>,
    stop: CancellationToken,
}

impl Pool {
    /// Starts building a pool with the given configuration.
    pub fn builder(cfg: Config) -> PoolBuilder {
        PoolBuilder::new(cfg)
    }

    /// The shared queue manager, for producers that talk to it directly.
    pub fn queue(&self) -> Arc<QueueManager> {
        Arc::clone(&self.queue)
    }

    /// The event bus; useful for ad-hoc `subscribe()` in tools and tests.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Submits a job; returns its queue position at admission time.
    pub async fn submit(&self, job: JobRequest) -> Result<usize, SubmitError> {
        self.queue.submit(job).await
    }

    /// Cancels a job on behalf of `requested_by` (must be the owner).
    pub async fn cancel(&self, id: JobId, requested_by: &str) -> Result<(), CancelError> {
        self.queue.cancel(id, requested_by).await
    }

    /// Pending jobs in priority order.
    pub async fn list_queue(&self) -> Vec<JobSummary> {
        self.queue.list().await
    }

    /// Registers a worker and starts its actor loop.
    pub async fn spawn_worker(
        &self,
        id: impl Into<Arc<str>>,
        connector: Arc<dyn Connector>,
    ) -> Result<(), RegisterError> {
        if self.stop.is_cancelled() {
            return Err(RegisterError::Shutdown);
        }
        let id: Arc<str> = id.into();
        let mut workers = self.workers.write().await;
        if workers.contains_key(&id) {
            return Err(RegisterError::DuplicateWorker {
                worker: id.to_string(),
            });
        }

        let endpoint = connector.endpoint().to_string();
        let record = Arc::new(RwLock::new(WorkerRecord::new(Arc::clone(&id))));
        let reset = Arc::new(Notify::new());
        let claim_token = CancellationToken::new();
        let force_token = CancellationToken::new();

        let actor = BotActor {
            id: Arc::clone(&id),
            queue: Arc::clone(&self.queue),
            record: Arc::clone(&record),
            supervisor: ConnectionSupervisor::new(
                connector,
                self.cfg.backoff,
                self.cfg.max_retries,
                Arc::clone(&id),
                self.bus.clone(),
            ),
            behaviors: self.behaviors.clone(),
            bus: self.bus.clone(),
            default_deadline: self.cfg.default_deadline(),
            max_consecutive_failures: self.cfg.max_consecutive_failures,
            reset: Arc::clone(&reset),
        };
        let join = tokio::spawn(actor.run(claim_token.clone(), force_token.clone()));

        debug!(worker = %id, %endpoint, "worker registered");
        workers.insert(
            id,
            WorkerHandle {
                record,
                endpoint,
                claim_token,
                force_token,
                reset,
                join,
            },
        );
        Ok(())
    }

    /// Stops one worker. Graceful lets the in-flight job finish; forced
    /// cancels it. The worker stays listed (as `Stopped`) until
    /// [`deregister`](Self::deregister).
    pub async fn stop_worker(&self, id: &str, graceful: bool) -> Result<(), StateError> {
        let workers = self.workers.read().await;
        let handle = workers.get(id).ok_or_else(|| StateError::UnknownWorker {
            worker: id.to_string(),
        })?;
        handle.claim_token.cancel();
        if !graceful {
            handle.force_token.cancel();
        }
        Ok(())
    }

    /// Stops (gracefully unless already stopped) and removes one worker,
    /// waiting for its actor task to exit.
    pub async fn deregister(&self, id: &str) -> Result<(), StateError> {
        let handle = {
            let mut workers = self.workers.write().await;
            workers.remove(id).ok_or_else(|| StateError::UnknownWorker {
                worker: id.to_string(),
            })?
        };
        handle.claim_token.cancel();
        if handle.join.await.is_err() {
            warn!(worker = id, "worker task panicked during deregister");
        }
        Ok(())
    }

    /// Moves a worker out of `Error` back to `Idle` and clears its failure
    /// streak. Rejects workers in any other state.
    pub async fn reset_worker(&self, id: &str) -> Result<(), StateError> {
        let workers = self.workers.read().await;
        let handle = workers.get(id).ok_or_else(|| StateError::UnknownWorker {
            worker: id.to_string(),
        })?;
        {
            let mut rec = handle.record.write().await;
            if rec.state != BotState::Error {
                return Err(StateError::Conflict {
                    from: rec.state,
                    to: BotState::Idle,
                });
            }
            rec.transition(BotState::Idle)?;
            rec.consecutive_failures = 0;
        }
        self.bus
            .publish(Event::now(EventKind::WorkerReset).with_worker(id.to_string()));
        handle.reset.notify_one();
        Ok(())
    }

    /// Snapshot of one worker.
    pub async fn worker(&self, id: &str) -> Option<WorkerSummary> {
        let workers = self.workers.read().await;
        let handle = workers.get(id)?;
        let summary = handle.record.read().await.summary(&handle.endpoint);
        Some(summary)
    }

    /// Snapshots of all registered workers, sorted by id.
    pub async fn list_workers(&self) -> Vec<WorkerSummary> {
        let workers = self.workers.read().await;
        let mut out = Vec::with_capacity(workers.len());
        for handle in workers.values() {
            out.push(handle.record.read().await.summary(&handle.endpoint));
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Shuts the whole pool down.
    ///
    /// Closes the queue to new submissions, stops all claims, and waits up
    /// to [`Config::grace`] for actors to drain. A forced shutdown cancels
    /// in-flight jobs and reconnect waits up front.
    ///
    /// Idempotent: a second call finds no workers and returns `Ok`.
    pub async fn shutdown(&self, graceful: bool) -> Result<(), RuntimeError> {
        self.queue.shutdown();
        self.stop.cancel();

        let mut handles: Vec<WorkerHandle> = {
            let mut workers = self.workers.write().await;
            workers.drain().map(|(_, h)| h).collect()
        };
        for h in &handles {
            h.claim_token.cancel();
            if !graceful {
                h.force_token.cancel();
            }
        }

        let grace = self.cfg.grace;
        let drained = time::timeout(grace, async {
            for h in handles.iter_mut() {
                if (&mut h.join).await.is_err() {
                    warn!("worker task panicked during shutdown");
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                self.subs.shutdown().await;
                Ok(())
            }
            Err(_) => {
                let stuck = handles.iter().filter(|h| !h.join.is_finished()).count();
                // Last resort: cancel whatever is still holding things up.
                for h in &handles {
                    h.force_token.cancel();
                }
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Runs until the process receives a termination signal, then performs
    /// a graceful shutdown.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        select! {
            res = shutdown::wait_for_shutdown_signal() => {
                if let Err(e) = res {
                    warn!(error = %e, "signal listener failed, shutting down");
                }
            }
            _ = self.stop.cancelled() => {}
        }
        self.shutdown(true).await
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn spawn_listener(self: &Arc<Self>) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "event listener lagged, events dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
