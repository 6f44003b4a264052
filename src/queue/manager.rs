//! # QueueManager: admission, claiming, cancellation.
//!
//! Layers admission policy on the pure [`PriorityQueue`] and owns the only
//! state shared across all workers. Every operation locks the same mutex,
//! so admission-check-then-mutate is atomic: no owner exceeds its cap and
//! no job is handed to two claimers, regardless of interleaving.
//!
//! ## Claim path
//! ```text
//! claim_next(worker):
//! loop {
//!   ├─► shut down? ──► Err(Shutdown)
//!   ├─► lock; pop highest-priority entry
//!   │     ├─ Some ─► mark claimed (same critical section, no ambiguity
//!   │     │          window), chain-wake if entries remain,
//!   │     │          publish Started ─► return ClaimedJob
//!   │     └─ None ─► unlock
//!   └─► wait: notified() | shutdown
//! }
//! ```
//!
//! ## Wakeup discipline
//! Every successful submit calls `notify_one`; a successful claim
//! re-notifies when entries remain. A claimer always re-checks the queue
//! before waiting, so a notification landing between check and wait is
//! absorbed by the stored permit and no pending job can be stranded.
//!
//! ## Terminal events
//! `report_outcome` removes the claimed entry and publishes the terminal
//! event in one critical section; a second report for the same job finds no
//! entry and is a no-op, which is what makes the terminal event exactly-once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{CancelError, QueueError, SubmitError};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{JobId, JobOutcome, JobRequest};
use crate::policies::TierPolicy;
use crate::queue::PriorityQueue;

/// A job handed to exactly one worker.
///
/// The token is the job's cooperative cancellation signal: triggered by a
/// producer cancel, deadline expiry, or a forced stop.
pub struct ClaimedJob {
    /// The claimed request.
    pub job: JobRequest,
    /// Per-job cancellation token; also held by the manager for routing
    /// `cancel` calls.
    pub cancel: CancellationToken,
}

/// Row of the admin queue listing, in dequeue order.
#[derive(Debug, Clone)]
pub struct JobSummary {
    /// Job id.
    pub id: JobId,
    /// Owner identity.
    pub owner: Arc<str>,
    /// Behavior kind.
    pub kind: Arc<str>,
    /// Effective tier used for ordering.
    pub tier: u8,
    /// Current 1-indexed position.
    pub position: usize,
    /// Admission timestamp.
    pub enqueued_at: SystemTime,
}

/// Bookkeeping for a job between claim and outcome.
struct ClaimedEntry {
    owner: Arc<str>,
    worker: Arc<str>,
    cancellable: bool,
    cancel: CancellationToken,
}

/// Shared state; one mutex guards all of it.
#[derive(Default)]
struct Inner {
    queue: PriorityQueue,
    claimed: HashMap<JobId, ClaimedEntry>,
    owner_active: HashMap<Arc<str>, usize>,
}

/// Admission policy and claiming on top of the priority queue.
pub struct QueueManager {
    inner: Mutex<Inner>,
    notify: Notify,
    shutdown: CancellationToken,
    bus: Bus,
    owner_cap: usize,
    tier_policy: TierPolicy,
}

impl QueueManager {
    /// Creates a manager with the given configuration, tier policy, and bus.
    pub fn new(cfg: &Config, tier_policy: TierPolicy, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            shutdown: CancellationToken::new(),
            bus,
            owner_cap: cfg.owner_cap_clamped(),
            tier_policy,
        })
    }

    /// Admits a job, returning its 1-indexed queue position.
    ///
    /// Rejections are synchronous and leave no trace: invalid fields,
    /// duplicate job ids, owner cap exceeded, or a shut-down manager.
    pub async fn submit(&self, job: JobRequest) -> Result<usize, SubmitError> {
        if self.shutdown.is_cancelled() {
            return Err(SubmitError::Shutdown);
        }
        validate(&job)?;

        let mut inner = self.inner.lock().await;

        if inner.queue.contains(job.id) || inner.claimed.contains_key(&job.id) {
            return Err(SubmitError::DuplicateJob { id: job.id });
        }
        let active = inner.owner_active.get(&job.owner).copied().unwrap_or(0);
        if active >= self.owner_cap {
            return Err(SubmitError::DuplicateOwner {
                owner: job.owner.to_string(),
                cap: self.owner_cap,
            });
        }

        let id = job.id;
        let owner = Arc::clone(&job.owner);
        let tier = self.tier_policy.tier_for(&job);
        let position = inner.queue.enqueue(job, tier);
        *inner.owner_active.entry(Arc::clone(&owner)).or_insert(0) += 1;

        self.bus.publish(
            Event::now(EventKind::Enqueued)
                .with_job(id)
                .with_owner(owner)
                .with_tier(tier)
                .with_position(position),
        );
        self.notify.notify_one();
        Ok(position)
    }

    /// Claims the next job for `worker`, suspending while the queue is empty.
    ///
    /// Claiming and marking happen in one critical section; the `Started`
    /// event is published before the job is returned.
    pub async fn claim_next(&self, worker: &Arc<str>) -> Result<ClaimedJob, QueueError> {
        loop {
            if self.shutdown.is_cancelled() {
                return Err(QueueError::Shutdown);
            }

            {
                let mut inner = self.inner.lock().await;
                if let Some(entry) = inner.queue.pop() {
                    let cancel = CancellationToken::new();
                    inner.claimed.insert(
                        entry.job.id,
                        ClaimedEntry {
                            owner: Arc::clone(&entry.job.owner),
                            worker: Arc::clone(worker),
                            cancellable: entry.job.cancellable,
                            cancel: cancel.clone(),
                        },
                    );
                    if !inner.queue.is_empty() {
                        self.notify.notify_one();
                    }
                    self.bus.publish(
                        Event::now(EventKind::Started)
                            .with_job(entry.job.id)
                            .with_owner(Arc::clone(&entry.job.owner))
                            .with_worker(Arc::clone(worker)),
                    );
                    return Ok(ClaimedJob {
                        job: entry.job,
                        cancel,
                    });
                }
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = self.shutdown.cancelled() => return Err(QueueError::Shutdown),
            }
        }
    }

    /// Cancels a job on behalf of its owner.
    ///
    /// Pending jobs are removed and get their terminal `Cancelled` event
    /// here; claimed jobs get their token triggered and the owning worker
    /// reports the terminal outcome when it observes the signal.
    pub async fn cancel(&self, id: JobId, requested_by: &str) -> Result<(), CancelError> {
        let mut inner = self.inner.lock().await;

        if inner.queue.contains(id) {
            let owner_matches = inner
                .queue
                .get(id)
                .is_some_and(|p| &*p.job.owner == requested_by);
            if !owner_matches {
                return Err(CancelError::NotPermitted {
                    id,
                    requested_by: requested_by.to_string(),
                });
            }
            let Some(entry) = inner.queue.remove(id) else {
                return Err(CancelError::NotFound { id });
            };
            release_owner(&mut inner, &entry.job.owner);
            self.bus.publish(
                Event::now(EventKind::Cancelled)
                    .with_job(id)
                    .with_reason("cancelled while pending"),
            );
            return Ok(());
        }

        if let Some(claimed) = inner.claimed.get(&id) {
            if &*claimed.owner != requested_by {
                return Err(CancelError::NotPermitted {
                    id,
                    requested_by: requested_by.to_string(),
                });
            }
            if !claimed.cancellable {
                return Err(CancelError::NotCancellable { id });
            }
            claimed.cancel.cancel();
            return Ok(());
        }

        Err(CancelError::NotFound { id })
    }

    /// Records the terminal outcome of a claimed job and publishes exactly
    /// one terminal event. A repeated report is a benign no-op.
    pub async fn report_outcome(&self, id: JobId, outcome: JobOutcome) {
        let mut inner = self.inner.lock().await;
        let Some(entry) = inner.claimed.remove(&id) else {
            return;
        };
        release_owner(&mut inner, &entry.owner);

        // Published under the lock so a resubmission of the same id cannot
        // overtake this terminal event.
        let event = match outcome {
            JobOutcome::Completed(payload) => {
                let ev = Event::now(EventKind::Completed)
                    .with_job(id)
                    .with_worker(entry.worker);
                match payload {
                    Some(bytes) => ev.with_payload(bytes),
                    None => ev,
                }
            }
            JobOutcome::Failed(reason) => Event::now(EventKind::Failed)
                .with_job(id)
                .with_worker(entry.worker)
                .with_reason(reason.to_string()),
            JobOutcome::Cancelled { reason } => Event::now(EventKind::Cancelled)
                .with_job(id)
                .with_worker(entry.worker)
                .with_reason(reason),
        };
        self.bus.publish(event);
    }

    /// Current 1-indexed position of a pending job, or `None`.
    pub async fn position_of(&self, id: JobId) -> Option<usize> {
        self.inner.lock().await.queue.position_of(id)
    }

    /// Pending jobs in dequeue order, for the admin surface.
    pub async fn list(&self) -> Vec<JobSummary> {
        let inner = self.inner.lock().await;
        inner
            .queue
            .iter()
            .enumerate()
            .map(|(i, e)| JobSummary {
                id: e.job.id,
                owner: Arc::clone(&e.job.owner),
                kind: Arc::clone(&e.job.kind),
                tier: e.tier,
                position: i + 1,
                enqueued_at: e.enqueued_at,
            })
            .collect()
    }

    /// Number of pending jobs.
    pub async fn pending(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    /// Number of claimed, unresolved jobs.
    pub async fn in_flight(&self) -> usize {
        self.inner.lock().await.claimed.len()
    }

    /// Stops handing out jobs and wakes every blocked claimer. Idempotent.
    ///
    /// Pending jobs stay queued; in-flight jobs resolve through their
    /// workers as usual.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            self.bus.publish(Event::now(EventKind::ShutdownRequested));
            self.shutdown.cancel();
        }
    }

    /// True once [`Self::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Frees one owner slot, dropping the counter entry at zero.
fn release_owner(inner: &mut Inner, owner: &Arc<str>) {
    if let Some(active) = inner.owner_active.get_mut(owner) {
        *active = active.saturating_sub(1);
        if *active == 0 {
            inner.owner_active.remove(owner);
        }
    }
}

/// Synchronous field validation; rejected jobs are never enqueued.
fn validate(job: &JobRequest) -> Result<(), SubmitError> {
    if job.owner.trim().is_empty() {
        return Err(SubmitError::Invalid {
            reason: "owner must not be empty".to_string(),
        });
    }
    if job.kind.trim().is_empty() {
        return Err(SubmitError::Invalid {
            reason: "kind must not be empty".to_string(),
        });
    }
    if job.id.is_nil() {
        return Err(SubmitError::Invalid {
            reason: "job id must not be nil".to_string(),
        });
    }
    Ok(())
}
