// --- File: crates/notifly_realtime/src/client.rs ---
use crate::backoff::ReconnectPolicy;
use crate::error::RealtimeError;
use crate::packet::{EnginePacket, SocketPacket};
use crate::registry::{Listener, ListenerRegistry};
use crate::state::{
    ChannelEvent, ConnectionState, DisconnectReason, SERVER_EVENT_CONNECTED,
    SERVER_EVENT_NEW_NOTIFICATION,
};
use crate::transport::{establish, Endpoint, Session, Transport};
use notifly_common::Notification;
use notifly_config::{AppConfig, RealtimeConfig};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const GOODBYE_TIMEOUT: Duration = Duration::from_secs(1);

/// Client for the server's push channel.
///
/// One instance per session. `connect` spawns a background task on the
/// current tokio runtime that owns the transport, answers heartbeats,
/// reconnects with backoff and dispatches events to registered listeners.
pub struct ChannelClient {
    inner: Arc<Inner>,
    worker: Mutex<Option<Worker>>,
}

struct Inner {
    base_url: String,
    config: RealtimeConfig,
    policy: ReconnectPolicy,
    http: Client,
    registry: ListenerRegistry,
    state: watch::Sender<ConnectionState>,
    // Bumped by every connect/disconnect. A task only writes state or emits
    // while its generation is current.
    generation: AtomicU64,
}

struct Worker {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Worker {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    fn stop(self) {
        let _ = self.shutdown.send(true);
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn update(&self, generation: u64, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if self.is_current(generation) && *state != next {
                *state = next;
                true
            } else {
                false
            }
        });
    }

    fn force(&self, next: ConnectionState) {
        self.state.send_replace(next);
    }

    fn emit(&self, generation: u64, event: &ChannelEvent) {
        if self.is_current(generation) {
            self.registry.emit(event);
        }
    }
}

impl ChannelClient {
    pub fn new(base_url: impl Into<String>, config: RealtimeConfig, http: Client) -> Self {
        let policy = ReconnectPolicy::from_config(&config);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                base_url: base_url.into(),
                config,
                policy,
                http,
                registry: ListenerRegistry::new(),
                state,
                generation: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AppConfig, http: Client) -> Self {
        Self::new(config.server.base_url.clone(), config.realtime.clone(), http)
    }

    /// Starts the connection with `token`. A no-op while a connection task
    /// is already running, whatever its token.
    ///
    /// Must be called from within a tokio runtime; otherwise the state
    /// becomes [`ConnectionState::ConnectError`] and nothing is spawned.
    pub fn connect(&self, token: &str) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.as_ref().is_some_and(Worker::is_running) {
            debug!("realtime channel already active, connect ignored");
            return;
        }
        if let Some(stale) = worker.take() {
            stale.stop();
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "connect called outside a tokio runtime");
                self.inner.force(ConnectionState::ConnectError {
                    attempt: 0,
                    message: e.to_string(),
                });
                return;
            }
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.force(ConnectionState::Connecting);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = runtime.spawn(run_channel(
            self.inner.clone(),
            generation,
            token.to_string(),
            shutdown_rx,
        ));
        *worker = Some(Worker { shutdown, task });
    }

    /// Closes the connection, cancels pending reconnects and drops every
    /// listener. Safe to call when not connected.
    pub fn disconnect(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let was_connected = self.inner.state.borrow().is_connected();

        if let Some(worker) = worker {
            worker.stop();
            info!("realtime channel disconnected by client");
        }
        self.inner.force(ConnectionState::Disconnected);
        if was_connected {
            self.inner.registry.emit(&ChannelEvent::Disconnected {
                reason: DisconnectReason::ClientDisconnect,
            });
        }
        self.inner.registry.clear();
    }

    /// Registers `listener` for `event`. Returns `false` if it already was.
    pub fn on(&self, event: &str, listener: &Listener) -> bool {
        self.inner.registry.on(event, listener)
    }

    pub fn off(&self, event: &str, listener: &Listener) -> bool {
        self.inner.registry.off(event, listener)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.registry.listener_count(event)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.stop();
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // a dropped sender means the client is gone
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run_channel(
    inner: Arc<Inner>,
    generation: u64,
    token: String,
    mut shutdown: watch::Receiver<bool>,
) {
    let endpoint = match Endpoint::new(&inner.base_url, &inner.config.path, &token) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            error!(error = %e, "cannot build realtime endpoint");
            inner.update(
                generation,
                ConnectionState::ConnectError {
                    attempt: 0,
                    message: e.to_string(),
                },
            );
            return;
        }
    };
    let policy = inner.policy.clone();
    let mut attempt: u32 = 0;

    loop {
        let established = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => return,
            result = tokio::time::timeout(
                policy.handshake_timeout,
                establish(&inner.http, &endpoint, &inner.config),
            ) => result,
        };

        match established {
            Ok(Ok(session)) => {
                let transport = session.transport.kind();
                info!(?transport, sid = %session.handshake.sid, "realtime channel connected");
                inner.update(generation, ConnectionState::Connected { transport });
                inner.emit(generation, &ChannelEvent::Connected { transport });

                let connected_at = Instant::now();
                let reason = run_session(&inner, generation, session, &mut shutdown).await;
                if reason == DisconnectReason::ClientDisconnect {
                    return;
                }
                let uptime = connected_at.elapsed();
                warn!(%reason, ?uptime, "realtime channel disconnected");
                inner.update(generation, ConnectionState::Disconnected);
                inner.emit(generation, &ChannelEvent::Disconnected { reason });

                if policy.is_stable(uptime) {
                    attempt = 0;
                }
            }
            Ok(Err(err)) => {
                if err.is_endpoint_missing() {
                    error!(
                        error = %err,
                        path = %inner.config.path,
                        "realtime endpoint unreachable, check that the socket server is mounted"
                    );
                } else {
                    warn!(error = %err, attempt, "realtime connect failed");
                }
                inner.update(
                    generation,
                    ConnectionState::ConnectError {
                        attempt,
                        message: err.to_string(),
                    },
                );
            }
            Err(_) => {
                let message = format!(
                    "handshake timed out after {}ms",
                    policy.handshake_timeout.as_millis()
                );
                warn!(attempt, "{}", message);
                inner.update(generation, ConnectionState::ConnectError { attempt, message });
            }
        }

        if !policy.enabled {
            info!("reconnection disabled, giving up");
            return;
        }
        attempt += 1;
        if !policy.allows(attempt) {
            error!(
                attempts = policy.max_attempts,
                "realtime reconnection failed after all attempts"
            );
            inner.update(generation, ConnectionState::ReconnectFailed);
            inner.emit(generation, &ChannelEvent::ReconnectFailed);
            return;
        }

        let delay = policy.delay_for(attempt);
        debug!(attempt, ?delay, "scheduling reconnect");
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => return,
            _ = tokio::time::sleep(delay) => {}
        }
        info!(attempt, "reconnect attempt");
        inner.update(generation, ConnectionState::Reconnecting { attempt });
        inner.emit(generation, &ChannelEvent::ReconnectAttempt { attempt });
    }
}

async fn run_session(
    inner: &Inner,
    generation: u64,
    mut session: Session,
    shutdown: &mut watch::Receiver<bool>,
) -> DisconnectReason {
    let deadline = session.handshake.heartbeat_deadline();
    let mut pending = std::mem::take(&mut session.pending);

    loop {
        while let Some(packet) = pending.pop_front() {
            if let Some(reason) = handle_packet(inner, generation, &mut session.transport, packet).await {
                return reason;
            }
        }

        let received = tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => {
                let _ = tokio::time::timeout(GOODBYE_TIMEOUT, session.transport.shutdown()).await;
                return DisconnectReason::ClientDisconnect;
            }
            received = tokio::time::timeout(deadline, session.transport.recv()) => received,
        };

        match received {
            Ok(Ok(packets)) => pending.extend(packets),
            Ok(Err(RealtimeError::Closed)) => return DisconnectReason::TransportClose,
            Ok(Err(err)) => {
                warn!(error = %err, "realtime transport error");
                return DisconnectReason::TransportError;
            }
            Err(_) => return DisconnectReason::PingTimeout,
        }
    }
}

async fn handle_packet(
    inner: &Inner,
    generation: u64,
    transport: &mut Transport,
    packet: EnginePacket,
) -> Option<DisconnectReason> {
    match packet {
        EnginePacket::Ping(data) => {
            if let Err(err) = transport.send(EnginePacket::Pong(data)).await {
                warn!(error = %err, "failed to answer heartbeat");
                return Some(DisconnectReason::TransportError);
            }
        }
        EnginePacket::Message(data) => match SocketPacket::decode(&data) {
            Ok(SocketPacket::Event { name, args }) => dispatch_event(inner, generation, &name, args),
            Ok(SocketPacket::Disconnect) => return Some(DisconnectReason::ServerDisconnect),
            Ok(SocketPacket::ConnectError(reason)) => {
                warn!(%reason, "server revoked the session");
                return Some(DisconnectReason::ServerDisconnect);
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "dropping malformed packet"),
        },
        EnginePacket::Close => return Some(DisconnectReason::TransportClose),
        _ => {}
    }
    None
}

fn dispatch_event(inner: &Inner, generation: u64, name: &str, args: Vec<Value>) {
    match name {
        SERVER_EVENT_NEW_NOTIFICATION => {
            let payload = args.into_iter().next();
            match payload.map(serde_json::from_value::<Notification>) {
                Some(Ok(notification)) => {
                    debug!(id = notification.id, kind = ?notification.kind, "notification received");
                    inner.emit(generation, &ChannelEvent::Notification(notification));
                }
                Some(Err(err)) => warn!(error = %err, "dropping malformed notification"),
                None => warn!("new_notification event without payload"),
            }
        }
        SERVER_EVENT_CONNECTED => info!(payload = ?args.first(), "server acknowledged channel"),
        other => debug!(event = other, "ignoring server event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_outside_runtime_reports_error() {
        let client = ChannelClient::new("http://localhost:1", RealtimeConfig::default(), Client::new());
        client.connect("token");
        assert!(matches!(client.state(), ConnectionState::ConnectError { attempt: 0, .. }));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_disconnect_when_idle_is_harmless() {
        let client = ChannelClient::new("http://localhost:1", RealtimeConfig::default(), Client::new());
        let listener = Listener::new(|_| {});
        client.on("notification", &listener);
        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.listener_count("notification"), 0);
    }

    #[tokio::test]
    async fn test_invalid_base_url_stops_task() {
        let client = ChannelClient::new("not a url", RealtimeConfig::default(), Client::new());
        let mut state = client.watch_state();
        client.connect("token");
        let reached = tokio::time::timeout(
            Duration::from_secs(2),
            state.wait_for(|s| matches!(s, ConnectionState::ConnectError { .. })),
        )
        .await;
        assert!(reached.is_ok());
    }
}
