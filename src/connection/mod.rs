//! # Connection abstraction and supervision.
//!
//! Each worker owns exactly one external connection, hidden behind the
//! [`Connector`]/[`Connection`] traits. The [`ConnectionSupervisor`] wraps
//! that pair with automatic recovery: bounded exponential backoff with
//! jitter, a retry budget, and restore/exhaustion reporting to the worker
//! state machine.
//!
//! ## Contents
//! - [`Connector`], [`Connection`] — open/send/receive/close with
//!   transient-vs-fatal errors
//! - [`ConnectionSupervisor`], [`ConnectionHandle`], [`ConnectionStatus`] —
//!   single-connection recovery loop and its observable state

mod supervisor;
mod transport;

pub use supervisor::{ConnectionHandle, ConnectionStatus, ConnectionSupervisor, Reconnect};
pub use transport::{Connection, Connector};
