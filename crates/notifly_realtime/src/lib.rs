// --- File: crates/notifly_realtime/src/lib.rs ---
//! Realtime notification channel.
//!
//! Speaks Engine.IO v4 / Socket.IO v5 to the social API: long-polling first
//! with an upgrade to websocket when offered, heartbeat handling, and
//! reconnection with capped exponential backoff. Server `new_notification`
//! events are surfaced to listeners as [`ChannelEvent::Notification`].

pub mod backoff;
pub mod client;
pub mod error;
pub mod packet;
pub mod registry;
pub mod state;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use client::ChannelClient;
pub use error::RealtimeError;
pub use registry::{Listener, ListenerRegistry};
pub use state::{
    ChannelEvent, ConnectionState, DisconnectReason, EVENT_CONNECT, EVENT_DISCONNECT,
    EVENT_NOTIFICATION, EVENT_RECONNECT_ATTEMPT, EVENT_RECONNECT_FAILED,
};
