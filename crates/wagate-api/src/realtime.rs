//! Socket.IO notification stream with auto-reconnect.
//!
//! Connects to the gateway's Socket.IO endpoint over the websocket
//! transport and streams parsed server events through a
//! [`tokio::sync::broadcast`] channel. Session rooms joined through the
//! handle are re-joined after every reconnect; reconnection uses
//! exponential backoff + jitter. A namespace disconnect sent by the server
//! ends the loop for good.
//!
//! # Example
//!
//! ```rust,ignore
//! use wagate_api::realtime::{RealtimeHandle, ReconnectConfig, ServerEvent};
//! use wagate_api::socketio::SocketEndpoint;
//! use tokio_util::sync::CancellationToken;
//!
//! let endpoint = SocketEndpoint::from_api_base(&"http://localhost:3001/api".parse()?)?;
//! let handle = RealtimeHandle::connect(endpoint, ReconnectConfig::default(), CancellationToken::new());
//! let mut rx = handle.subscribe();
//! handle.join("sales")?;
//!
//! while let Ok(event) = rx.recv().await {
//!     if let ServerEvent::Qr(qr) = event.as_ref() {
//!         println!("{}: {}", qr.session_name, qr.qr);
//!     }
//! }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::socketio::{EnginePacket, SocketEndpoint, SocketPacket};

// ── Event names ──────────────────────────────────────────────────────

pub const JOIN_SESSION: &str = "join-session";
pub const LEAVE_SESSION: &str = "leave-session";
pub const QR_EVENT: &str = "qr";
pub const CONNECTION_EVENT: &str = "connection";

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Used until the server's handshake supplies real heartbeat timings.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

// ── ServerEvent ──────────────────────────────────────────────────────

/// A fresh pairing QR for a device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrUpdate {
    pub session_name: String,
    pub qr: String,
}

/// A change in a device session's connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionUpdate {
    pub session_name: String,
    pub status: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// An event pushed by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Qr(QrUpdate),
    Connection(ConnectionUpdate),
    /// Any other event name, or a known name whose payload did not parse.
    Other { name: String, args: Vec<Value> },
}

impl ServerEvent {
    fn from_socket(name: String, args: Vec<Value>) -> Self {
        let first = args.first().cloned().unwrap_or(Value::Null);
        match name.as_str() {
            QR_EVENT => match serde_json::from_value(first) {
                Ok(qr) => return Self::Qr(qr),
                Err(e) => tracing::debug!(error = %e, "unparseable qr payload"),
            },
            CONNECTION_EVENT => match serde_json::from_value(first) {
                Ok(update) => return Self::Connection(update),
                Err(e) => tracing::debug!(error = %e, "unparseable connection payload"),
            },
            _ => {}
        }
        Self::Other { name, args }
    }

    /// The event name as sent on the wire.
    pub fn name(&self) -> &str {
        match self {
            Self::Qr(_) => QR_EVENT,
            Self::Connection(_) => CONNECTION_EVENT,
            Self::Other { name, .. } => name,
        }
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for socket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 5s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_retries: None,
        }
    }
}

// ── RealtimeHandle ───────────────────────────────────────────────────

enum Outbound {
    Join(String),
    Leave(String),
    Emit { name: String, arg: Value },
}

/// Handle to a running socket connection.
///
/// Dropping the handle does not stop the background task; call
/// [`shutdown`](Self::shutdown) or cancel the token passed to
/// [`connect`](Self::connect).
pub struct RealtimeHandle {
    event_rx: broadcast::Receiver<Arc<ServerEvent>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    connected: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl RealtimeHandle {
    /// Spawn the connection loop. Must be called inside a tokio runtime.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Emits issued before the server acknowledges the
    /// namespace are buffered and flushed once it does.
    pub fn connect(
        endpoint: SocketEndpoint,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected) = watch::channel(false);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            socket_loop(endpoint, event_tx, outbound_rx, connected_tx, reconnect, task_cancel)
                .await;
        });

        Self {
            event_rx,
            outbound,
            connected,
            cancel,
        }
    }

    /// Get a new broadcast receiver for the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ServerEvent>> {
        self.event_rx.resubscribe()
    }

    /// Join a device session's room. Re-sent automatically after reconnects.
    pub fn join(&self, session_name: &str) -> Result<(), Error> {
        self.send(Outbound::Join(session_name.to_owned()))
    }

    /// Leave a device session's room.
    pub fn leave(&self, session_name: &str) -> Result<(), Error> {
        self.send(Outbound::Leave(session_name.to_owned()))
    }

    /// Emit an arbitrary event with a single argument.
    pub fn emit(&self, name: &str, arg: Value) -> Result<(), Error> {
        self.send(Outbound::Emit {
            name: name.to_owned(),
            arg,
        })
    }

    /// Whether the namespace is currently connected.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Watch the connected flag.
    pub fn connection_watch(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Whether the background task has been told to stop (or has stopped).
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.outbound.is_closed()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn send(&self, msg: Outbound) -> Result<(), Error> {
        self.outbound
            .send(msg)
            .map_err(|_| Error::WebSocketConnect("socket task has stopped".into()))
    }
}

// ── Background reconnection loop ─────────────────────────────────────

struct LoopState {
    endpoint: SocketEndpoint,
    rooms: BTreeSet<String>,
    pending: Vec<(String, Value)>,
    /// Set once the namespace is acknowledged on the current connection.
    established: bool,
}

/// How a single connection ended without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Local shutdown via the cancellation token.
    Cancelled,
    /// The server sent a namespace disconnect. Reconnecting is up to the
    /// caller, as with socket.io's `io server disconnect`.
    ServerDisconnect,
    /// Close frame, Engine.IO close or end of stream.
    Dropped,
}

/// Main loop: connect → read → backoff → reconnect, until cancelled or
/// the server explicitly disconnects the namespace.
async fn socket_loop(
    endpoint: SocketEndpoint,
    event_tx: broadcast::Sender<Arc<ServerEvent>>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    connected: watch::Sender<bool>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut state = LoopState {
        endpoint,
        rooms: BTreeSet::new(),
        pending: Vec::new(),
        established: false,
    };
    let mut attempt: u32 = 0;

    loop {
        state.established = false;
        let result =
            connect_and_read(&mut state, &event_tx, &mut outbound, &connected, &cancel).await;
        connected.send_replace(false);

        if cancel.is_cancelled() {
            break;
        }

        // A connection that got as far as the namespace ack starts a
        // fresh backoff sequence.
        if state.established {
            attempt = 0;
        }

        match result {
            Ok(SessionEnd::Cancelled) => break,
            Ok(SessionEnd::ServerDisconnect) => {
                tracing::info!("server disconnected the namespace, not reconnecting");
                break;
            }
            Ok(SessionEnd::Dropped) => {
                tracing::info!(attempt, "socket closed by peer");
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "socket error");
            }
        }

        if let Some(max) = reconnect.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "socket reconnection limit reached, giving up");
                break;
            }
        }

        let delay = calculate_backoff(attempt, &reconnect);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    tracing::debug!("socket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one websocket connection and run it until it drops.
async fn connect_and_read(
    state: &mut LoopState,
    event_tx: &broadcast::Sender<Arc<ServerEvent>>,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    connected: &watch::Sender<bool>,
    cancel: &CancellationToken,
) -> Result<SessionEnd, Error> {
    let url = state.endpoint.url.clone();
    let namespace = state.endpoint.namespace.clone();
    tracing::info!(url = %url, namespace, "connecting to socket");

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
        res = tokio_tungstenite::connect_async(url.as_str()) => {
            res.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let mut heartbeat = HANDSHAKE_TIMEOUT;
    let mut deadline = Instant::now() + heartbeat;
    let mut namespace_ready = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = send_frame(&mut write, SocketPacket::Disconnect { namespace: namespace.clone() }.to_frame()).await;
                let _ = write.send(Message::Close(None)).await;
                return Ok(SessionEnd::Cancelled);
            }
            () = tokio::time::sleep_until(deadline) => {
                return Err(Error::WebSocketConnect("heartbeat timed out".into()));
            }
            Some(msg) = outbound.recv() => {
                let frames = state.apply(msg, &namespace, namespace_ready);
                for frame in frames {
                    send_frame(&mut write, frame).await?;
                }
            }
            frame = read.next() => {
                deadline = Instant::now() + heartbeat;
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "socket close frame received");
                        } else {
                            tracing::info!("socket close frame received (no payload)");
                        }
                        return Ok(SessionEnd::Dropped);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!("socket stream ended");
                        return Ok(SessionEnd::Dropped);
                    }
                };

                match EnginePacket::decode(&text)? {
                    EnginePacket::Open(handshake) => {
                        heartbeat = Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout));
                        deadline = Instant::now() + heartbeat;
                        tracing::debug!(sid = %handshake.sid, "engine handshake complete");
                        send_frame(&mut write, SocketPacket::connect(&namespace).to_frame()).await?;
                    }
                    EnginePacket::Ping(data) => {
                        send_frame(&mut write, EnginePacket::Pong(data).encode()).await?;
                    }
                    EnginePacket::Close => return Ok(SessionEnd::Dropped),
                    EnginePacket::Message(payload) => {
                        match SocketPacket::decode(&payload) {
                            Ok(packet) if packet.namespace() != namespace => {
                                tracing::trace!(namespace = packet.namespace(), "ignoring packet for other namespace");
                            }
                            Ok(SocketPacket::Connect { .. }) => {
                                namespace_ready = true;
                                state.established = true;
                                connected.send_replace(true);
                                tracing::info!("socket connected");
                                for frame in state.on_connected(&namespace) {
                                    send_frame(&mut write, frame).await?;
                                }
                            }
                            Ok(SocketPacket::ConnectError { data, .. }) => {
                                let reason = data.map(|d| d.to_string()).unwrap_or_default();
                                return Err(Error::WebSocketConnect(format!("namespace refused: {reason}")));
                            }
                            Ok(SocketPacket::Disconnect { .. }) => {
                                tracing::info!("server closed the namespace");
                                return Ok(SessionEnd::ServerDisconnect);
                            }
                            Ok(SocketPacket::Event { name, args, .. }) => {
                                let event = ServerEvent::from_socket(name, args);
                                tracing::debug!(event = event.name(), "socket event");
                                // No subscribers is fine.
                                let _ = event_tx.send(Arc::new(event));
                            }
                            Ok(SocketPacket::Ack { .. }) => {}
                            Err(e) => tracing::debug!(error = %e, "skipping undecodable socket packet"),
                        }
                    }
                    EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
                }
            }
        }
    }
}

impl LoopState {
    /// Record an outbound request and return the frames to write now.
    fn apply(&mut self, msg: Outbound, namespace: &str, ready: bool) -> Vec<String> {
        let (name, arg) = match msg {
            Outbound::Join(session) => {
                if !self.rooms.insert(session.clone()) {
                    return Vec::new();
                }
                (JOIN_SESSION.to_owned(), Value::String(session))
            }
            Outbound::Leave(session) => {
                if !self.rooms.remove(&session) {
                    return Vec::new();
                }
                (LEAVE_SESSION.to_owned(), Value::String(session))
            }
            Outbound::Emit { name, arg } => {
                if !ready {
                    self.pending.push((name, arg));
                    return Vec::new();
                }
                (name, arg)
            }
        };
        if ready {
            vec![SocketPacket::event(namespace, &name, arg).to_frame()]
        } else {
            // Rooms are replayed from `self.rooms` once connected.
            Vec::new()
        }
    }

    /// Frames to send right after the namespace is acknowledged.
    fn on_connected(&mut self, namespace: &str) -> Vec<String> {
        let rooms = self
            .rooms
            .iter()
            .map(|room| SocketPacket::event(namespace, JOIN_SESSION, Value::String(room.clone())));
        let queued = self
            .pending
            .drain(..)
            .map(|(name, arg)| SocketPacket::event(namespace, &name, arg));
        rooms.chain(queued).map(|p| p.to_frame()).collect()
    }
}

async fn send_frame<S>(sink: &mut S, frame: String) -> Result<(), Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    sink.send(Message::text(frame))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(16)).unwrap_or(16);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────
