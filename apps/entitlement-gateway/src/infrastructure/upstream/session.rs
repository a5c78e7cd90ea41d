//! WebSocket Session Adapter
//!
//! Concrete [`UpstreamSession`] over a WebSocket connection: a writer task
//! drains outgoing frames, a reader task decodes inbound events and
//! demultiplexes them — events answering a correlated request go to that
//! request's dedicated queue, service-open acknowledgements resolve their
//! pending waiters, everything else flows to the shared stream consumed by
//! `next_event`.
//!
//! There is no reconnection: a transport failure ends the reader task,
//! the shared stream drains, and `next_event` returns `None`. The caller
//! reports the failure upward and tears the session down.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventQueue, SessionError, UpstreamSession};
use crate::domain::event::{CorrelationId, Event, EventType, MessageContents};
use crate::domain::identity::ServiceName;
use crate::domain::request::{
    APIAUTH_SERVICE, AuthorizationRequest, REFDATA_SERVICE, ReferenceDataRequest,
};

use super::codec::JsonCodec;
use super::messages::RequestFrame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the WebSocket session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the upstream server.
    pub url: String,
    /// Bound on service-open acknowledgement waits.
    pub ack_timeout: Duration,
    /// Capacity of the shared event stream.
    pub shared_capacity: usize,
    /// Capacity of each dedicated per-request queue.
    pub queue_capacity: usize,
}

impl SessionConfig {
    /// Create a configuration for the given host and port.
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            url: format!("ws://{host}:{port}"),
            ack_timeout: Duration::from_secs(10),
            shared_capacity: 1024,
            queue_capacity: 4,
        }
    }
}

// =============================================================================
// Pending State
// =============================================================================

/// Routing state shared between the reader task and the request methods.
#[derive(Debug, Default)]
struct PendingState {
    /// Dedicated queues keyed by correlation value. An entry is removed
    /// when its terminating event is routed.
    queues: HashMap<String, mpsc::Sender<Event>>,
    /// Waiters for service-open acknowledgements, keyed by service name.
    opens: HashMap<ServiceName, oneshot::Sender<Result<(), String>>>,
}

type SharedPending = Arc<parking_lot::Mutex<PendingState>>;

// =============================================================================
// Session
// =============================================================================

/// WebSocket-backed upstream session.
pub struct WsSession {
    config: SessionConfig,
    outgoing_tx: mpsc::Sender<RequestFrame>,
    shared_rx: tokio::sync::Mutex<mpsc::Receiver<Event>>,
    pending: SharedPending,
    open_services: parking_lot::RwLock<HashSet<ServiceName>>,
    cancel: CancellationToken,
}

impl WsSession {
    /// Connect to the upstream server and start the session tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the WebSocket connection cannot be established.
    pub async fn connect(
        config: SessionConfig,
        cancel: CancellationToken,
    ) -> Result<Self, SessionError> {
        tracing::info!(url = %config.url, "connecting to upstream session");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(config.url.as_str())
            .await
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        let (write, read) = ws_stream.split();

        let (outgoing_tx, outgoing_rx) = mpsc::channel(64);
        let (shared_tx, shared_rx) = mpsc::channel(config.shared_capacity);
        let pending: SharedPending = Arc::new(parking_lot::Mutex::new(PendingState::default()));

        tokio::spawn(write_loop(write, outgoing_rx, cancel.clone()));
        tokio::spawn(read_loop(
            read,
            shared_tx,
            Arc::clone(&pending),
            cancel.clone(),
        ));

        Ok(Self {
            config,
            outgoing_tx,
            shared_rx: tokio::sync::Mutex::new(shared_rx),
            pending,
            open_services: parking_lot::RwLock::new(HashSet::new()),
            cancel,
        })
    }

    fn require_open(&self, service: &str) -> Result<(), SessionError> {
        if self.open_services.read().contains(service) {
            Ok(())
        } else {
            Err(SessionError::ServiceNotOpen(service.to_string()))
        }
    }
}

#[async_trait]
impl UpstreamSession for WsSession {
    async fn open_service(&self, service: &str) -> Result<(), SessionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending
            .lock()
            .opens
            .insert(service.to_string(), ack_tx);

        if self
            .outgoing_tx
            .send(RequestFrame::open_service(service))
            .await
            .is_err()
        {
            self.pending.lock().opens.remove(service);
            return Err(SessionError::Closed);
        }

        match tokio::time::timeout(self.config.ack_timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => {
                self.open_services.write().insert(service.to_string());
                tracing::info!(service, "service opened");
                Ok(())
            }
            Ok(Ok(Err(reason))) => Err(SessionError::ServiceOpenFailure {
                service: service.to_string(),
                reason,
            }),
            Ok(Err(_)) => Err(SessionError::ServiceOpenFailure {
                service: service.to_string(),
                reason: "session closed".to_string(),
            }),
            Err(_) => {
                self.pending.lock().opens.remove(service);
                Err(SessionError::ServiceOpenFailure {
                    service: service.to_string(),
                    reason: "acknowledgement timed out".to_string(),
                })
            }
        }
    }

    async fn send_authorization_request(
        &self,
        request: AuthorizationRequest,
        correlation: CorrelationId,
    ) -> Result<EventQueue, SessionError> {
        self.require_open(APIAUTH_SERVICE)?;

        let (queue_tx, queue) = EventQueue::channel(self.config.queue_capacity);
        self.pending
            .lock()
            .queues
            .insert(correlation.value().to_string(), queue_tx);

        let frame = RequestFrame::authorize(APIAUTH_SERVICE, &request, &correlation);
        if self.outgoing_tx.send(frame).await.is_err() {
            self.pending.lock().queues.remove(correlation.value());
            return Err(SessionError::Closed);
        }

        Ok(queue)
    }

    async fn send_request(&self, request: ReferenceDataRequest) -> Result<(), SessionError> {
        self.require_open(REFDATA_SERVICE)?;

        self.outgoing_tx
            .send(RequestFrame::reference_data(REFDATA_SERVICE, &request))
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn next_event(&self) -> Option<Event> {
        self.shared_rx.lock().await.recv().await
    }

    async fn stop(&self) {
        tracing::info!("stopping session");
        self.cancel.cancel();
    }
}

// =============================================================================
// Session Tasks
// =============================================================================

/// Drain outgoing frames onto the socket until cancelled.
async fn write_loop(
    mut write: SplitSink<WsStream, WsMessage>,
    mut outgoing_rx: mpsc::Receiver<RequestFrame>,
    cancel: CancellationToken,
) {
    let codec = JsonCodec::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = write.send(WsMessage::Close(None)).await;
                return;
            }
            frame = outgoing_rx.recv() => {
                let Some(frame) = frame else {
                    let _ = write.send(WsMessage::Close(None)).await;
                    return;
                };
                match codec.encode_frame(&frame) {
                    Ok(json) => {
                        if let Err(e) = write.send(WsMessage::Text(json.into())).await {
                            tracing::warn!(error = %e, "failed to send frame");
                            return;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to encode frame"),
                }
            }
        }
    }
}

/// Decode inbound frames and route them until the stream ends or the
/// session is cancelled. Dropping `shared_tx` on return ends the shared
/// stream for the consumer.
async fn read_loop(
    mut read: SplitStream<WsStream>,
    shared_tx: mpsc::Sender<Event>,
    pending: SharedPending,
    cancel: CancellationToken,
) {
    let codec = JsonCodec::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            frame = read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    match codec.decode_event(&text) {
                        Ok(event) => route_event(event, &shared_tx, &pending).await,
                        Err(e) => tracing::warn!(error = %e, "dropping undecodable frame"),
                    }
                }
                Some(Ok(WsMessage::Close(_))) => {
                    tracing::info!("upstream closed the session");
                    return;
                }
                Some(Ok(_)) => {
                    // Binary/ping/pong frames are not part of the protocol.
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "session transport error");
                    return;
                }
                None => {
                    tracing::info!("session stream ended");
                    return;
                }
            }
        }
    }
}

/// Route one inbound event: open acks resolve waiters, correlated events
/// go to their dedicated queue, everything else to the shared stream.
async fn route_event(event: Event, shared_tx: &mpsc::Sender<Event>, pending: &SharedPending) {
    if event.event_type == EventType::ServiceStatus && resolve_open_ack(&event, pending) {
        return;
    }

    if let Some(queue_tx) = take_queue_for(&event, pending) {
        if queue_tx.send(event).await.is_err() {
            tracing::debug!("dedicated queue receiver gone; dropping event");
        }
        return;
    }

    if shared_tx.send(event).await.is_err() {
        tracing::debug!("shared stream consumer gone; dropping event");
    }
}

/// Resolve a pending service-open waiter. Returns whether the event was
/// consumed as an acknowledgement.
fn resolve_open_ack(event: &Event, pending: &SharedPending) -> bool {
    for message in &event.messages {
        match &message.contents {
            MessageContents::ServiceOpened { service } => {
                if let Some(ack_tx) = pending.lock().opens.remove(service) {
                    let _ = ack_tx.send(Ok(()));
                    return true;
                }
            }
            MessageContents::ServiceOpenFailure { service, reason } => {
                if let Some(ack_tx) = pending.lock().opens.remove(service) {
                    let _ = ack_tx.send(Err(reason.clone()));
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Find and remove the dedicated queue answering this event, if any.
/// One terminating event per correlated request.
fn take_queue_for(event: &Event, pending: &SharedPending) -> Option<mpsc::Sender<Event>> {
    let mut state = pending.lock();
    event
        .correlation_ids()
        .find_map(|id| state.queues.remove(id.value()))
}

// =============================================================================
// Tests
// =============================================================================
