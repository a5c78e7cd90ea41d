//! Session Port
//!
//! Interface over the upstream session consumed by the application
//! services. Every component that talks to the session receives this
//! capability explicitly; there is no module-level singleton.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::event::{CorrelationId, Event};
use crate::domain::identity::ServiceName;
use crate::domain::request::{AuthorizationRequest, ReferenceDataRequest};

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by the session.
///
/// All of these are transport-level: they abort the run after a diagnostic
/// and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Could not establish the upstream connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A service open was rejected or never acknowledged.
    #[error("failed to open service {service}: {reason}")]
    ServiceOpenFailure {
        /// The service that failed to open.
        service: ServiceName,
        /// Failure description.
        reason: String,
    },

    /// A request was submitted against a service that is not open.
    #[error("service not open: {0}")]
    ServiceNotOpen(ServiceName),

    /// The session is no longer able to send or receive.
    #[error("session closed")]
    Closed,
}

// =============================================================================
// Event Queue
// =============================================================================

/// Dedicated per-request event queue.
///
/// Authorization requests receive their terminating event here instead of
/// on the shared stream, so the workflow can block on exactly one answer.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::Receiver<Event>,
}

impl EventQueue {
    /// Create a queue together with the sender that feeds it.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<Event>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    /// Wait for the next event, up to `timeout`.
    ///
    /// Returns `None` on timeout or when the feeding side is gone; the
    /// caller treats both as a failed exchange.
    pub async fn next_event(&mut self, timeout: Duration) -> Option<Event> {
        tokio::time::timeout(timeout, self.rx.recv()).await.ok()?
    }
}

// =============================================================================
// Session Port
// =============================================================================

/// Capability handle over the upstream session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamSession: Send + Sync {
    /// Open a named service. Must succeed before requests against that
    /// service may be submitted.
    async fn open_service(&self, service: &str) -> Result<(), SessionError>;

    /// Submit an authorization request tagged with `correlation` and
    /// return the dedicated queue its terminating event will arrive on.
    async fn send_authorization_request(
        &self,
        request: AuthorizationRequest,
        correlation: CorrelationId,
    ) -> Result<EventQueue, SessionError>;

    /// Submit the data request on the shared stream using the gateway's
    /// own session credentials.
    async fn send_request(&self, request: ReferenceDataRequest) -> Result<(), SessionError>;

    /// Receive the next event from the shared stream. Returns `None` once
    /// the session has terminated.
    async fn next_event(&self) -> Option<Event>;

    /// Tear the session down. Safe to call on every exit path.
    async fn stop(&self);
}
