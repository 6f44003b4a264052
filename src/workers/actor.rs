//! # BotActor: single-worker claim/execute/recover loop.
//!
//! One actor per worker. Each cycle:
//! ```text
//! loop {
//!   ├─► parked in Error? wait for admin reset
//!   ├─► link down? Idle → Starting, bring it up, → back to Idle
//!   │     └─► Exhausted → Error, park
//!   ├─► claim_next() (blocks in Idle until a job or stop)
//!   ├─► Idle → Starting → Running, execute the behavior
//!   │     ├─► transient loss, retryable     → Reconnecting, resume on restore
//!   │     ├─► transient loss, non-retryable → fail now, recover before next claim
//!   │     ├─► deadline slice expires        → Failed(Timeout)
//!   │     └─► reconnect exhausted / fatal   → Failed, worker → Error
//!   ├─► report_outcome() (queue publishes the terminal event)
//!   └─► Running|Reconnecting → Idle, or park in Error
//! }
//! ```
//!
//! ## Rules
//! - At most one job per worker at a time; the claim itself is the lock.
//! - The deadline covers wall-clock time including reconnect gaps; each
//!   execution attempt runs under the *remaining* slice.
//! - A graceful stop lets the in-flight cycle finish; a forced stop cancels
//!   the job token and aborts reconnect waits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::select;
use tokio::sync::{Notify, RwLock};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::{ConnectionSupervisor, Reconnect};
use crate::error::JobError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{BehaviorRegistry, FailureReason, JobContext, JobOutcome};
use crate::queue::{ClaimedJob, QueueManager};
use crate::workers::state::{BotState, WorkerRecord};

/// How a mid-job connection loss resolved.
enum Recovered {
    /// Link restored; re-run the same job under the remaining deadline.
    Resume,
    /// Recovery did not restore the job; outcome plus whether to park.
    Outcome(JobOutcome, bool),
}

/// The claim/execute/recover loop for one worker.
pub(crate) struct BotActor {
    pub id: Arc<str>,
    pub queue: Arc<QueueManager>,
    pub record: Arc<RwLock<WorkerRecord>>,
    pub supervisor: ConnectionSupervisor,
    pub behaviors: BehaviorRegistry,
    pub bus: Bus,
    pub default_deadline: Option<Duration>,
    pub max_consecutive_failures: u32,
    /// Signalled by the pool after an admin reset out of `Error`.
    pub reset: Arc<Notify>,
}

impl BotActor {
    /// Runs until the claim token fires (graceful stop) or the loop breaks
    /// out of a cancelled wait. Leaves the record in `Stopped`.
    pub(crate) async fn run(
        mut self,
        claim_token: CancellationToken,
        force_token: CancellationToken,
    ) {
        loop {
            if claim_token.is_cancelled() {
                break;
            }

            if self.record.read().await.state == BotState::Error {
                select! {
                    _ = self.reset.notified() => {
                        // The pool already moved the record to Idle.
                        self.supervisor.reset();
                        debug!(worker = %self.id, "worker reset, resuming");
                        continue;
                    }
                    _ = claim_token.cancelled() => break,
                }
            }

            // Bring the link up before claiming so a dead endpoint parks
            // the worker instead of sitting on a claimed job.
            if !self.supervisor.is_connected() {
                if self.transition(BotState::Starting).await.is_err() {
                    break;
                }
                match self.supervisor.ensure_connected(&force_token).await {
                    Reconnect::Restored { .. } => {
                        let _ = self.transition(BotState::Idle).await;
                    }
                    Reconnect::Cancelled => break,
                    Reconnect::Exhausted { attempts } => {
                        self.enter_error(format!(
                            "connection failed before claim ({attempts} attempt(s))"
                        ))
                        .await;
                        continue;
                    }
                }
            }

            // The record rests in Idle for as long as this wait lasts.
            let claimed = select! {
                res = self.queue.claim_next(&self.id) => match res {
                    Ok(claimed) => claimed,
                    Err(_) => break,
                },
                _ = claim_token.cancelled() => break,
            };

            let job_id = claimed.job.id;
            {
                let mut rec = self.record.write().await;
                let dispatched = rec.transition(BotState::Starting).is_ok() && {
                    rec.bind_job(job_id);
                    rec.transition(BotState::Running).is_ok()
                };
                if !dispatched {
                    // Unreachable in practice; give the claim back as cancelled.
                    rec.clear_job();
                    drop(rec);
                    self.queue
                        .report_outcome(job_id, JobOutcome::cancelled("worker stopping"))
                        .await;
                    break;
                }
            }

            let (outcome, park) = self.execute(claimed, &force_token).await;
            let failed = matches!(outcome, JobOutcome::Failed(_));
            let completed = matches!(outcome, JobOutcome::Completed(_));
            self.queue.report_outcome(job_id, outcome).await;

            {
                let mut rec = self.record.write().await;
                rec.clear_job();
                if failed {
                    rec.consecutive_failures = rec.consecutive_failures.saturating_add(1);
                } else if completed {
                    rec.consecutive_failures = 0;
                }
            }

            let failures = self.record.read().await.consecutive_failures;
            if park {
                self.enter_error("recovery exhausted".to_string()).await;
            } else if failed
                && self.max_consecutive_failures > 0
                && failures >= self.max_consecutive_failures
            {
                self.enter_error(format!("{failures} consecutive job failures"))
                    .await;
            } else {
                let _ = self.transition(BotState::Idle).await;
            }
        }

        self.stop().await;
    }

    /// Executes one claimed job to a terminal outcome.
    ///
    /// Returns the outcome plus whether the worker must park in `Error`
    /// (reconnect budget exhausted or a fatal link failure).
    async fn execute(
        &mut self,
        claimed: ClaimedJob,
        force_token: &CancellationToken,
    ) -> (JobOutcome, bool) {
        let ClaimedJob { job, cancel } = claimed;
        let deadline = job.deadline.or(self.default_deadline);
        let started = Instant::now();

        let behavior = match self.behaviors.resolve(&job.kind) {
            Some(b) => b,
            None => {
                return (
                    JobOutcome::Failed(FailureReason::Behavior {
                        detail: format!("no behavior registered for kind '{}'", job.kind),
                    }),
                    false,
                )
            }
        };
        let ctx = JobContext::new(job.id, Arc::clone(&self.id), cancel.clone(), self.bus.clone());

        loop {
            let remaining = match deadline {
                Some(d) => match d.checked_sub(started.elapsed()) {
                    Some(rem) => Some(rem),
                    None => {
                        cancel.cancel();
                        return (
                            JobOutcome::Failed(FailureReason::Timeout { deadline: d }),
                            false,
                        );
                    }
                },
                None => None,
            };

            let conn = match self.supervisor.connection() {
                Some(c) => c,
                None => {
                    // Link dropped between restore and execute; treat as lost.
                    match self
                        .recover(&job, "connection unavailable", &cancel, force_token)
                        .await
                    {
                        Recovered::Resume => continue,
                        Recovered::Outcome(outcome, park) => return (outcome, park),
                    }
                }
            };

            let attempt = behavior.execute(&job, conn.as_mut(), &ctx);
            let result = select! {
                res = async {
                    match remaining {
                        Some(rem) => time::timeout(rem, attempt)
                            .await
                            .unwrap_or_else(|_| Err(JobError::Timeout {
                                deadline: deadline.unwrap_or_default(),
                            })),
                        None => attempt.await,
                    }
                } => res,
                _ = force_token.cancelled() => {
                    cancel.cancel();
                    return (JobOutcome::cancelled("forced stop"), false);
                }
            };

            match result {
                Ok(payload) => return (JobOutcome::Completed(payload), false),
                Err(JobError::Canceled) => {
                    return (JobOutcome::cancelled("requested"), false);
                }
                Err(JobError::Timeout { deadline }) => {
                    cancel.cancel();
                    return (JobOutcome::Failed(FailureReason::Timeout { deadline }), false);
                }
                Err(JobError::Connection(e)) => {
                    let detail = e.to_string();
                    if self.supervisor.observe_failure(&e).await {
                        match self.recover(&job, &detail, &cancel, force_token).await {
                            Recovered::Resume => continue,
                            Recovered::Outcome(outcome, park) => return (outcome, park),
                        }
                    } else {
                        // Fatal link failure: fail the job and park the worker.
                        return (
                            JobOutcome::Failed(FailureReason::ConnectionLost { detail }),
                            true,
                        );
                    }
                }
                Err(e @ (JobError::Fatal { .. } | JobError::Fail { .. })) => {
                    return (
                        JobOutcome::Failed(FailureReason::Behavior {
                            detail: e.to_string(),
                        }),
                        false,
                    );
                }
                Err(e) => {
                    warn!(worker = %self.id, job = %job.id, error = %e, "unexpected job error");
                    return (
                        JobOutcome::Failed(FailureReason::Behavior {
                            detail: e.to_string(),
                        }),
                        false,
                    );
                }
            }
        }
    }

    /// Handles a transient loss observed mid-job.
    ///
    /// The supervisor has already dropped the link and published
    /// `ConnectionLost`. A retryable job rides out the reconnect loop and
    /// resumes; a non-retryable one fails immediately (the link itself is
    /// recovered lazily, before the next claim).
    async fn recover(
        &mut self,
        job: &crate::jobs::JobRequest,
        detail: &str,
        cancel: &CancellationToken,
        force_token: &CancellationToken,
    ) -> Recovered {
        if !job.retryable {
            return Recovered::Outcome(
                JobOutcome::Failed(FailureReason::ConnectionLost {
                    detail: detail.to_string(),
                }),
                false,
            );
        }

        let _ = self.transition(BotState::Reconnecting).await;
        let reconnected = self.supervisor.reconnect(force_token).await;
        // A cancel issued while the link was down wins over however the
        // reconnect resolved.
        if cancel.is_cancelled() {
            return Recovered::Outcome(JobOutcome::cancelled("requested"), false);
        }
        match reconnected {
            Reconnect::Restored { .. } => {
                let _ = self.transition(BotState::Running).await;
                Recovered::Resume
            }
            Reconnect::Exhausted { attempts } => Recovered::Outcome(
                JobOutcome::Failed(FailureReason::ExhaustedRetries { attempts }),
                true,
            ),
            Reconnect::Cancelled => Recovered::Outcome(JobOutcome::cancelled("shutdown"), false),
        }
    }

    /// Parks the worker in `Error` and publishes `WorkerErrored`.
    async fn enter_error(&mut self, reason: String) {
        {
            let mut rec = self.record.write().await;
            rec.clear_job();
            if let Err(e) = rec.transition(BotState::Error) {
                warn!(worker = %self.id, error = %e, "could not park worker");
                return;
            }
        }
        warn!(worker = %self.id, %reason, "worker parked in error state");
        self.bus.publish(
            Event::now(EventKind::WorkerErrored)
                .with_worker(Arc::clone(&self.id))
                .with_reason(reason),
        );
    }

    /// Final wind-down: `Stopping` then `Stopped`, link closed.
    async fn stop(&mut self) {
        {
            let mut rec = self.record.write().await;
            let _ = rec.transition(BotState::Stopping);
            let _ = rec.transition(BotState::Stopped);
        }
        self.supervisor.close().await;
        self.bus
            .publish(Event::now(EventKind::WorkerStopped).with_worker(Arc::clone(&self.id)));
        debug!(worker = %self.id, "worker stopped");
    }

    // &mut keeps the future Send: a shared borrow held across the lock
    // await would demand Sync from the boxed connection.
    async fn transition(&mut self, to: BotState) -> Result<(), crate::error::StateError> {
        self.record.write().await.transition(to)
    }
}
