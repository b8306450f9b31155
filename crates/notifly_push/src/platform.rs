// --- File: crates/notifly_push/src/platform.rs ---
//! The browser capabilities the push manager drives.
//!
//! Embedders implement [`PushPlatform`] over whatever actually owns push
//! registration; tests use [`mock::MockPlatform`].

use notifly_common::{BoxFuture, DisplayNotification, PushSubscription};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Notification permission tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Default,
    Granted,
    Denied,
}

/// Which of the three required capabilities the platform has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub worker_registration: bool,
    pub push_manager: bool,
    pub notifications: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            worker_registration: true,
            push_manager: true,
            notifications: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn supports_push(&self) -> bool {
        self.worker_registration && self.push_manager && self.notifications
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    /// Raw uncompressed P-256 point, 65 bytes.
    pub application_server_key: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform rejected the application server key
    #[error("InvalidAccessError: {0}")]
    InvalidAccess(String),

    #[error("NotAllowedError: {0}")]
    NotAllowed(String),

    #[error("{0}")]
    Failed(String),
}

pub trait PushPlatform: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn permission(&self) -> Permission;

    /// Prompts the user. May stay pending until the user answers.
    fn request_permission(&self) -> BoxFuture<'_, Permission, PlatformError>;

    /// The active agent registration's current subscription, if any.
    fn get_subscription(&self) -> BoxFuture<'_, Option<PushSubscription>, PlatformError>;

    fn subscribe(&self, options: SubscribeOptions) -> BoxFuture<'_, PushSubscription, PlatformError>;

    /// Revokes the current subscription. `Ok(false)` when there was none.
    fn unsubscribe(&self) -> BoxFuture<'_, bool, PlatformError>;

    fn show_notification(&self, notification: DisplayNotification) -> BoxFuture<'_, (), PlatformError>;
}
