//! The user-facing push toggle and the session-start auto-subscribe.

use crate::error::PushError;
use crate::manager::PushSubscriptionManager;
use crate::platform::Permission;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One message per failure kind shown to the user after a failed toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleMessage {
    LoginRequired,
    Permission,
    Vapid,
    Generic,
    Unexpected,
}

impl ToggleMessage {
    pub fn for_error(error: &PushError) -> Self {
        if error.is_permission() {
            ToggleMessage::Permission
        } else if error.is_vapid() {
            ToggleMessage::Vapid
        } else if error.is_transport() {
            ToggleMessage::Unexpected
        } else {
            ToggleMessage::Generic
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            ToggleMessage::LoginRequired => "You must be logged in to enable notifications",
            ToggleMessage::Permission => "Please allow notifications in your browser settings.",
            ToggleMessage::Vapid => "Push notifications are not configured on the server.",
            ToggleMessage::Generic => "Failed to update notification settings.",
            ToggleMessage::Unexpected => "An unexpected error occurred.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Enabled,
    Disabled,
    /// The control is disabled: push unsupported or permission blocked.
    Unavailable,
    Failed(ToggleMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub supported: bool,
    pub permission: Permission,
    pub subscribed: bool,
}

/// Cached view of the push state behind an on/off control.
pub struct PushToggle {
    manager: Arc<PushSubscriptionManager>,
    state: ToggleState,
}

impl PushToggle {
    pub async fn new(manager: Arc<PushSubscriptionManager>) -> Self {
        let mut toggle = Self {
            manager,
            state: ToggleState {
                supported: true,
                permission: Permission::Default,
                subscribed: false,
            },
        };
        toggle.refresh().await;
        toggle
    }

    /// Re-queries support, permission and subscription.
    pub async fn refresh(&mut self) -> ToggleState {
        self.state.supported = self.manager.is_supported();
        if self.state.supported {
            self.state.permission = self.manager.permission_status();
            self.state.subscribed = self.manager.is_subscribed().await;
        }
        self.state
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.supported && self.state.permission != Permission::Denied
    }

    pub fn description(&self) -> &'static str {
        if self.state.subscribed {
            "Receive notifications even when the app is closed"
        } else {
            "Enable to receive notifications when you're not on the site"
        }
    }

    pub fn warning(&self) -> Option<&'static str> {
        if !self.state.supported {
            Some("Push notifications are not supported in your browser.")
        } else if self.state.permission == Permission::Denied {
            Some("Notifications are blocked. Please enable them in your browser settings.")
        } else {
            None
        }
    }

    /// Flips the subscription. On failure the state is re-queried rather
    /// than assumed.
    pub async fn toggle(&mut self, token: &str) -> ToggleOutcome {
        if token.is_empty() {
            return ToggleOutcome::Failed(ToggleMessage::LoginRequired);
        }
        if !self.is_enabled() {
            return ToggleOutcome::Unavailable;
        }

        let result = if self.state.subscribed {
            self.manager.unsubscribe(token).await.map(|_| false)
        } else {
            self.manager.subscribe(token).await.map(|_| true)
        };

        match result {
            Ok(true) => {
                self.state.subscribed = true;
                self.state.permission = Permission::Granted;
                ToggleOutcome::Enabled
            }
            Ok(false) => {
                self.state.subscribed = false;
                ToggleOutcome::Disabled
            }
            Err(err) => {
                warn!(error = %err, "error toggling notifications");
                let message = ToggleMessage::for_error(&err);
                self.refresh().await;
                ToggleOutcome::Failed(message)
            }
        }
    }
}

/// Subscribes at session start when the user already granted permission
/// but holds no subscription. Returns whether a subscription exists
/// afterwards. Failures are logged only.
pub async fn auto_subscribe(manager: &PushSubscriptionManager, token: &str) -> bool {
    if token.is_empty() || !manager.is_supported() {
        return false;
    }
    if manager.is_subscribed().await {
        debug!("push subscription already present");
        return true;
    }
    if manager.permission_status() != Permission::Granted {
        debug!("notification permission not granted, skipping auto-subscribe");
        return false;
    }

    match manager.subscribe(token).await {
        Ok(subscription) => {
            info!(endpoint = %subscription.endpoint, "auto-subscribed to push notifications");
            true
        }
        Err(err) => {
            error!(error = %err, "failed to auto-subscribe to push notifications");
            false
        }
    }
}
