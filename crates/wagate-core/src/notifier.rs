// ── Realtime notifier ──
//
// Owns at most one socket connection and fans its QR and connection
// events out to registered listeners. Listeners are kept in an explicit
// list per event type; each registration returns a `Subscription` that
// removes it again when dropped.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wagate_api::{ConnectionUpdate, QrUpdate, RealtimeHandle, ReconnectConfig, ServerEvent, SocketEndpoint};

use crate::config::GatewayConfig;
use crate::error::CoreError;

type QrListener = Arc<dyn Fn(&QrUpdate) + Send + Sync>;
type ConnectionListener = Arc<dyn Fn(&ConnectionUpdate) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Qr,
    Connection,
}

// ── Listener registry ────────────────────────────────────────────────

#[derive(Default)]
struct Registry {
    next_id: u64,
    qr: Vec<(u64, QrListener)>,
    connection: Vec<(u64, ConnectionListener)>,
}

impl Registry {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove(&mut self, kind: EventKind, id: u64) {
        match kind {
            EventKind::Qr => self.qr.retain(|(i, _)| *i != id),
            EventKind::Connection => self.connection.retain(|(i, _)| *i != id),
        }
    }
}

type SharedRegistry = Arc<Mutex<Registry>>;

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // Listeners run outside the lock; a poisoned list is still intact.
    registry
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn dispatch(registry: &Mutex<Registry>, event: &ServerEvent) {
    match event {
        ServerEvent::Qr(update) => {
            let listeners: Vec<QrListener> =
                lock(registry).qr.iter().map(|(_, f)| Arc::clone(f)).collect();
            for listener in listeners {
                listener(update);
            }
        }
        ServerEvent::Connection(update) => {
            let listeners: Vec<ConnectionListener> = lock(registry)
                .connection
                .iter()
                .map(|(_, f)| Arc::clone(f))
                .collect();
            for listener in listeners {
                listener(update);
            }
        }
        ServerEvent::Other { name, .. } => debug!(event = %name, "unhandled socket event"),
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Registration of one listener. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters its listener immediately"]
pub struct Subscription {
    kind: EventKind,
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Unregister now. Equivalent to dropping.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(self.kind, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

// ── RealtimeNotifier ─────────────────────────────────────────────────

struct Connection {
    handle: RealtimeHandle,
    dispatcher: JoinHandle<()>,
}

/// Socket.IO client for device-session notifications.
pub struct RealtimeNotifier {
    endpoint: SocketEndpoint,
    reconnect: ReconnectConfig,
    registry: SharedRegistry,
    connection: Mutex<Option<Connection>>,
}

impl RealtimeNotifier {
    pub fn new(endpoint: SocketEndpoint, reconnect: ReconnectConfig) -> Self {
        Self {
            endpoint,
            reconnect,
            registry: Arc::default(),
            connection: Mutex::new(None),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, CoreError> {
        Ok(Self::new(config.socket_endpoint()?, config.reconnect.clone()))
    }

    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    fn slot(&self) -> MutexGuard<'_, Option<Connection>> {
        self.connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Open the socket. A no-op while a connection is already running.
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect(&self) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|c| !c.handle.is_closed()) {
            debug!("socket already running");
            return;
        }

        let handle = RealtimeHandle::connect(
            self.endpoint.clone(),
            self.reconnect.clone(),
            CancellationToken::new(),
        );
        let dispatcher = tokio::spawn(run_dispatcher(
            handle.subscribe(),
            Arc::clone(&self.registry),
        ));
        info!(url = %self.endpoint.url, "realtime notifier started");
        *slot = Some(Connection { handle, dispatcher });
    }

    /// Close the socket. Listeners stay registered for the next `connect`.
    pub fn disconnect(&self) {
        if let Some(conn) = self.slot().take() {
            conn.handle.shutdown();
            conn.dispatcher.abort();
            info!("realtime notifier stopped");
        }
    }

    /// Whether the socket is up and the namespace acknowledged.
    pub fn is_connected(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|c| c.handle.is_connected())
    }

    /// Watch the connected flag. `None` before [`connect`](Self::connect).
    pub fn connection_watch(&self) -> Option<watch::Receiver<bool>> {
        self.slot().as_ref().map(|c| c.handle.connection_watch())
    }

    // ── Rooms ────────────────────────────────────────────────────────

    /// Ask for events of `session_name`. Without a socket this does nothing.
    pub fn join_session(&self, session_name: &str) -> Result<(), CoreError> {
        self.with_handle("join", session_name, |h| h.join(session_name))
    }

    /// Stop events of `session_name`. Without a socket this does nothing.
    pub fn leave_session(&self, session_name: &str) -> Result<(), CoreError> {
        self.with_handle("leave", session_name, |h| h.leave(session_name))
    }

    fn with_handle(
        &self,
        action: &str,
        session_name: &str,
        f: impl FnOnce(&RealtimeHandle) -> Result<(), wagate_api::Error>,
    ) -> Result<(), CoreError> {
        let slot = self.slot();
        let Some(conn) = slot.as_ref() else {
            debug!(action, session = session_name, "no socket, ignoring");
            return Ok(());
        };
        f(&conn.handle)?;
        debug!(action, session = session_name, "room request queued");
        Ok(())
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Call `listener` for every QR push.
    pub fn on_qr<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&QrUpdate) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id();
        registry.qr.push((id, Arc::new(listener)));
        self.subscription(EventKind::Qr, id)
    }

    /// Call `listener` for every connection-status push.
    pub fn on_connection<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionUpdate) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id();
        registry.connection.push((id, Arc::new(listener)));
        self.subscription(EventKind::Connection, id)
    }

    /// Drop every QR listener, including ones other consumers registered.
    pub fn off_qr(&self) {
        lock(&self.registry).qr.clear();
    }

    /// Drop every connection listener, including ones other consumers registered.
    pub fn off_connection(&self) {
        lock(&self.registry).connection.clear();
    }

    pub fn listener_counts(&self) -> (usize, usize) {
        let registry = lock(&self.registry);
        (registry.qr.len(), registry.connection.len())
    }

    fn subscription(&self, kind: EventKind, id: u64) -> Subscription {
        Subscription {
            kind,
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }
}

impl Drop for RealtimeNotifier {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for RealtimeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (qr, connection) = self.listener_counts();
        f.debug_struct("RealtimeNotifier")
            .field("endpoint", &self.endpoint.url.as_str())
            .field("qr_listeners", &qr)
            .field("connection_listeners", &connection)
            .finish_non_exhaustive()
    }
}

async fn run_dispatcher(mut rx: broadcast::Receiver<Arc<ServerEvent>>, registry: SharedRegistry) {
    loop {
        match rx.recv().await {
            Ok(event) => dispatch(&registry, &event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "notifier fell behind, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("notifier dispatcher exiting");
}
