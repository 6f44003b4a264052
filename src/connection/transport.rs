//! # Transport traits.
//!
//! The core does not fix a wire protocol; it talks to the device through
//! these two traits. Implementations decide what a frame is and how the
//! link is established. Every failure is a
//! [`ConnectionError`](crate::ConnectionError) whose transient/fatal split
//! drives the supervisor: transient errors enter the reconnect loop, fatal
//! errors fail the job immediately.

use async_trait::async_trait;

use crate::error::ConnectionError;

/// Factory for one worker's connection.
///
/// Owned by a single [`ConnectionSupervisor`](super::ConnectionSupervisor);
/// `connect` is called for the initial open and for every reconnect attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a fresh connection to the endpoint.
    async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError>;

    /// Stable endpoint identity, used in handles and logs.
    fn endpoint(&self) -> &str;
}

/// One live, exclusive link to the external device.
///
/// Never shared across workers. A transport error does not have to leave
/// the connection usable; the supervisor discards it and reconnects.
#[async_trait]
pub trait Connection: Send {
    /// Sends one opaque frame.
    async fn send(&mut self, frame: &[u8]) -> Result<(), ConnectionError>;

    /// Receives one opaque frame.
    async fn receive(&mut self) -> Result<Vec<u8>, ConnectionError>;

    /// Closes the link. Errors on close are not actionable and are dropped.
    async fn close(&mut self);
}
