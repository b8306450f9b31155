// --- File: crates/notifly_push/src/manager.rs ---

use crate::error::PushError;
use crate::platform::{Permission, PlatformError, PushPlatform, SubscribeOptions};
use crate::server::PushServerClient;
use crate::vapid::decode_application_server_key;
use notifly_common::{DisplayNotification, PushSubscription};
use notifly_config::{AppConfig, PushConfig};
use reqwest::Client;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Owns the push registration lifecycle for one session.
pub struct PushSubscriptionManager {
    platform: Arc<dyn PushPlatform>,
    server: PushServerClient,
    config: PushConfig,
    /// Server key, fetched once per manager.
    vapid_key: OnceCell<String>,
    /// Endpoint this instance last registered with the server.
    registered: Mutex<Option<String>>,
}

impl PushSubscriptionManager {
    pub fn new(platform: Arc<dyn PushPlatform>, server: PushServerClient, config: PushConfig) -> Self {
        Self {
            platform,
            server,
            config,
            vapid_key: OnceCell::new(),
            registered: Mutex::new(None),
        }
    }

    pub fn from_config(platform: Arc<dyn PushPlatform>, config: &AppConfig, http: Client) -> Self {
        let server = PushServerClient::new(http, config.server.base_url.clone(), config.push.clone());
        Self::new(platform, server, config.push.clone())
    }

    pub fn is_supported(&self) -> bool {
        self.platform.capabilities().supports_push()
    }

    /// `Denied` when unsupported, otherwise the platform's permission.
    pub fn permission_status(&self) -> Permission {
        if !self.is_supported() {
            return Permission::Denied;
        }
        self.platform.permission()
    }

    /// Whether the platform holds a subscription. Errors read as `false`.
    pub async fn is_subscribed(&self) -> bool {
        if !self.is_supported() {
            return false;
        }
        match self.platform.get_subscription().await {
            Ok(subscription) => subscription.is_some(),
            Err(e) => {
                warn!(error = %e, "error checking subscription status");
                false
            }
        }
    }

    pub async fn request_permission(&self) -> Result<Permission, PushError> {
        if !self.is_supported() {
            return Err(PushError::Unsupported);
        }
        if self.platform.permission() == Permission::Granted {
            return Ok(Permission::Granted);
        }
        self.platform
            .request_permission()
            .await
            .map_err(|e| PushError::Platform(e.to_string()))
    }

    async fn vapid_key(&self) -> Result<&str, PushError> {
        self.vapid_key
            .get_or_try_init(|| self.server.fetch_vapid_key())
            .await
            .map(String::as_str)
    }

    /// Subscribes this browser profile and registers the subscription with
    /// the server. An existing platform subscription is reused; if this
    /// instance already registered that endpoint, the server call is skipped.
    pub async fn subscribe(&self, token: &str) -> Result<PushSubscription, PushError> {
        if !self.is_supported() {
            return Err(PushError::Unsupported);
        }

        let permission = self.request_permission().await?;
        if permission != Permission::Granted {
            return Err(PushError::PermissionDenied);
        }

        let key = decode_application_server_key(self.vapid_key().await?)?;

        let existing = self
            .platform
            .get_subscription()
            .await
            .map_err(|e| PushError::Platform(e.to_string()))?;

        let subscription = match existing {
            Some(subscription) => {
                debug!(endpoint = %subscription.endpoint, "already subscribed, reusing");
                subscription
            }
            None => {
                let options = SubscribeOptions {
                    user_visible_only: true,
                    application_server_key: key,
                };
                let created = self.platform.subscribe(options).await.map_err(|e| match e {
                    PlatformError::InvalidAccess(message) => PushError::InvalidKey(message),
                    other => PushError::Platform(other.to_string()),
                })?;
                info!(endpoint = %created.endpoint, "push subscription created");
                created
            }
        };

        if self.registered_endpoint().as_deref() == Some(subscription.endpoint.as_str()) {
            debug!("subscription already registered with server");
        } else {
            self.server.register(&subscription, token).await?;
            self.set_registered(Some(subscription.endpoint.clone()));
        }

        Ok(subscription)
    }

    /// Removes the server record first, then revokes the platform
    /// subscription. If the server call fails the platform subscription is
    /// left in place. Returns `false` when there was nothing to remove.
    pub async fn unsubscribe(&self, token: &str) -> Result<bool, PushError> {
        if !self.is_supported() {
            return Ok(false);
        }

        let Some(subscription) = self
            .platform
            .get_subscription()
            .await
            .map_err(|e| PushError::Platform(e.to_string()))?
        else {
            return Ok(false);
        };

        self.server.unregister(&subscription, token).await?;
        self.set_registered(None);

        self.platform
            .unsubscribe()
            .await
            .map_err(|e| PushError::Platform(e.to_string()))?;
        info!(endpoint = %subscription.endpoint, "unsubscribed from push notifications");
        Ok(true)
    }

    /// Renders a local notification without touching the server.
    pub async fn send_test_notification(&self) -> Result<(), PushError> {
        if !self.is_supported() {
            return Err(PushError::Unsupported);
        }
        if self.platform.permission() != Permission::Granted {
            return Err(PushError::PermissionNotGranted);
        }

        let notification = DisplayNotification {
            title: "Test Notification".to_string(),
            body: "This is a test notification from the browser".to_string(),
            icon: Some(self.config.icon.clone()),
            badge: Some(self.config.badge.clone()),
            ..DisplayNotification::default()
        };
        self.platform
            .show_notification(notification)
            .await
            .map_err(|e| PushError::Platform(e.to_string()))
    }

    fn registered_endpoint(&self) -> Option<String> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_registered(&self, endpoint: Option<String>) {
        *self.registered.lock().unwrap_or_else(PoisonError::into_inner) = endpoint;
    }
}
