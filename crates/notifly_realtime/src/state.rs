// --- File: crates/notifly_realtime/src/state.rs ---
use notifly_common::Notification;
use notifly_config::TransportKind;
use std::fmt;

/// Local event names listeners can register for.
pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_DISCONNECT: &str = "disconnect";
pub const EVENT_RECONNECT_ATTEMPT: &str = "reconnect_attempt";
pub const EVENT_RECONNECT_FAILED: &str = "reconnect_failed";
pub const EVENT_NOTIFICATION: &str = "notification";

/// Event names the server emits on the wire.
pub(crate) const SERVER_EVENT_NEW_NOTIFICATION: &str = "new_notification";
pub(crate) const SERVER_EVENT_CONNECTED: &str = "connected";

/// Observable state of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected { transport: TransportKind },
    /// Performing reconnect attempt `attempt` (1-based).
    Reconnecting { attempt: u32 },
    /// The last attempt failed; `attempt` is 0 for the initial connect.
    ConnectError { attempt: u32, message: String },
    /// Every reconnect attempt failed. Only an explicit `connect` leaves this.
    ReconnectFailed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

/// Why a live connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called locally.
    ClientDisconnect,
    /// The server sent a namespace disconnect.
    ServerDisconnect,
    TransportClose,
    TransportError,
    PingTimeout,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::ClientDisconnect => "io client disconnect",
            DisconnectReason::ServerDisconnect => "io server disconnect",
            DisconnectReason::TransportClose => "transport close",
            DisconnectReason::TransportError => "transport error",
            DisconnectReason::PingTimeout => "ping timeout",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a listener receives.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected { transport: TransportKind },
    Disconnected { reason: DisconnectReason },
    ReconnectAttempt { attempt: u32 },
    ReconnectFailed,
    Notification(Notification),
}

impl ChannelEvent {
    /// The registry name this event is dispatched under.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::Connected { .. } => EVENT_CONNECT,
            ChannelEvent::Disconnected { .. } => EVENT_DISCONNECT,
            ChannelEvent::ReconnectAttempt { .. } => EVENT_RECONNECT_ATTEMPT,
            ChannelEvent::ReconnectFailed => EVENT_RECONNECT_FAILED,
            ChannelEvent::Notification(_) => EVENT_NOTIFICATION,
        }
    }
}
