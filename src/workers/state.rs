//! # Worker state machine.
//!
//! Every worker owns a [`WorkerRecord`] and mutates it only through
//! [`WorkerRecord::transition`], which enforces the legal edge set.
//! Illegal edges surface as [`StateError::Conflict`] instead of being
//! silently coerced.

use std::sync::Arc;
use std::time::SystemTime;

use crate::error::StateError;
use crate::jobs::JobId;

/// Lifecycle state of a single worker.
///
/// ```text
/// Idle -> Starting -> Running -> Idle
///           |  |         |
///           |  v         v
///           | Error  Reconnecting -> Running | Idle | Error
///           v
///          Idle (link up, no claim yet)
///
/// any non-terminal -> Stopping -> Stopped
/// Error -> Idle (admin reset only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotState {
    /// Connected (or not yet needed) and ready to claim work.
    Idle,
    /// Bringing the link up, or moving a fresh claim into execution.
    Starting,
    /// Executing a claimed job.
    Running,
    /// Lost the connection mid-job; the supervisor is retrying.
    Reconnecting,
    /// Stop requested; winding down.
    Stopping,
    /// Terminal. The actor task has exited.
    Stopped,
    /// Parked after repeated failures. Requires an explicit reset.
    Error,
}

impl BotState {
    /// Whether moving from `self` to `to` is a legal edge.
    pub fn allows(self, to: BotState) -> bool {
        use BotState::*;
        match (self, to) {
            (Idle, Starting) => true,
            // Starting -> Idle: the link came up without a claim in hand.
            (Starting, Running) | (Starting, Idle) | (Starting, Error) => true,
            (Running, Idle) | (Running, Reconnecting) | (Running, Error) => true,
            (Reconnecting, Running) | (Reconnecting, Idle) | (Reconnecting, Error) => true,
            // Admin reset is the only way out of Error besides stopping.
            (Error, Idle) => true,
            (Stopping, Stopped) => true,
            // Any non-terminal state may begin winding down.
            (s, Stopping) => !matches!(s, Stopping | Stopped),
            _ => false,
        }
    }

    /// Stable label for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            BotState::Idle => "idle",
            BotState::Starting => "starting",
            BotState::Running => "running",
            BotState::Reconnecting => "reconnecting",
            BotState::Stopping => "stopping",
            BotState::Stopped => "stopped",
            BotState::Error => "error",
        }
    }
}

/// Mutable record of one worker, shared between its actor and the pool.
///
/// Invariant: `current_job` is `Some` exactly while the worker is in a
/// job-holding state (`Running` or `Reconnecting`); binding and clearing
/// happen through [`bind_job`](Self::bind_job) / [`clear_job`](Self::clear_job)
/// around the matching transitions.
#[derive(Debug)]
pub struct WorkerRecord {
    pub id: Arc<str>,
    pub state: BotState,
    pub current_job: Option<JobId>,
    pub consecutive_failures: u32,
    pub last_heartbeat: SystemTime,
}

impl WorkerRecord {
    pub(crate) fn new(id: Arc<str>) -> Self {
        Self {
            id,
            state: BotState::Idle,
            current_job: None,
            consecutive_failures: 0,
            last_heartbeat: SystemTime::now(),
        }
    }

    /// Moves the record to `to`, refreshing the heartbeat.
    ///
    /// Rejects illegal edges with [`StateError::Conflict`], and rejects
    /// entering a job-holding state without a bound job (or a non-holding
    /// resting state with one still bound).
    pub fn transition(&mut self, to: BotState) -> Result<(), StateError> {
        if !self.state.allows(to) {
            return Err(StateError::Conflict {
                from: self.state,
                to,
            });
        }
        let holds_job = matches!(to, BotState::Running | BotState::Reconnecting);
        let resting = matches!(to, BotState::Idle | BotState::Starting);
        if (holds_job && self.current_job.is_none()) || (resting && self.current_job.is_some()) {
            return Err(StateError::Conflict {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.touch();
        Ok(())
    }

    /// Binds the job the worker is about to run.
    pub(crate) fn bind_job(&mut self, id: JobId) {
        self.current_job = Some(id);
    }

    /// Clears the bound job after its outcome has been reported.
    pub(crate) fn clear_job(&mut self) {
        self.current_job = None;
    }

    /// Refreshes the liveness timestamp.
    pub(crate) fn touch(&mut self) {
        self.last_heartbeat = SystemTime::now();
    }

    pub(crate) fn summary(&self, endpoint: &str) -> WorkerSummary {
        WorkerSummary {
            id: self.id.to_string(),
            endpoint: endpoint.to_string(),
            state: self.state,
            current_job: self.current_job,
            consecutive_failures: self.consecutive_failures,
            last_heartbeat: self.last_heartbeat,
        }
    }
}

/// Point-in-time snapshot of a worker for admin listings.
#[derive(Debug, Clone)]
pub struct WorkerSummary {
    pub id: String,
    pub endpoint: String,
    pub state: BotState,
    pub current_job: Option<JobId>,
    pub consecutive_failures: u32,
    pub last_heartbeat: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record() -> WorkerRecord {
        WorkerRecord::new(Arc::from("bot-1"))
    }

    #[test]
    fn happy_path_cycle() {
        let mut r = record();
        r.transition(BotState::Starting).unwrap();
        r.bind_job(Uuid::new_v4());
        r.transition(BotState::Running).unwrap();
        r.clear_job();
        r.transition(BotState::Idle).unwrap();
    }

    #[test]
    fn starting_returns_to_idle_without_a_claim() {
        let mut r = record();
        r.transition(BotState::Starting).unwrap();
        r.transition(BotState::Idle).unwrap();
        assert_eq!(r.state, BotState::Idle);
    }

    #[test]
    fn illegal_edge_is_conflict() {
        let mut r = record();
        let err = r.transition(BotState::Running).unwrap_err();
        assert!(matches!(
            err,
            StateError::Conflict {
                from: BotState::Idle,
                to: BotState::Running
            }
        ));
        assert_eq!(r.state, BotState::Idle);
    }

    #[test]
    fn running_requires_bound_job() {
        let mut r = record();
        r.transition(BotState::Starting).unwrap();
        assert!(r.transition(BotState::Running).is_err());
    }

    #[test]
    fn idle_rejects_lingering_job() {
        let mut r = record();
        r.transition(BotState::Starting).unwrap();
        r.bind_job(Uuid::new_v4());
        r.transition(BotState::Running).unwrap();
        assert!(r.transition(BotState::Idle).is_err());
    }

    #[test]
    fn error_exits_only_to_idle_or_stopping() {
        let mut r = record();
        r.transition(BotState::Starting).unwrap();
        r.transition(BotState::Error).unwrap();
        assert!(!BotState::Error.allows(BotState::Running));
        assert!(BotState::Error.allows(BotState::Stopping));
        r.transition(BotState::Idle).unwrap();
        assert_eq!(r.state, BotState::Idle);
    }

    #[test]
    fn stopped_is_terminal() {
        for to in [
            BotState::Idle,
            BotState::Starting,
            BotState::Running,
            BotState::Stopping,
        ] {
            assert!(!BotState::Stopped.allows(to));
        }
    }
}
