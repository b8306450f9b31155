// --- File: crates/services/notifly_session/src/platform.rs ---
use notifly_common::{BoxFuture, DisplayNotification, PushSubscription};
use notifly_push::{Capabilities, Permission, PlatformError, PushPlatform, SubscribeOptions};
use tracing::info;

/// Push platform of a process without a browser: no worker registration,
/// no push manager. Notifications it is asked to show are logged.
#[derive(Debug, Default)]
pub struct HeadlessPlatform;

impl PushPlatform for HeadlessPlatform {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            notifications: true,
            ..Capabilities::none()
        }
    }

    fn permission(&self) -> Permission {
        Permission::Default
    }

    fn request_permission(&self) -> BoxFuture<'_, Permission, PlatformError> {
        Box::pin(async { Ok(Permission::Denied) })
    }

    fn get_subscription(&self) -> BoxFuture<'_, Option<PushSubscription>, PlatformError> {
        Box::pin(async { Ok(None) })
    }

    fn subscribe(&self, _options: SubscribeOptions) -> BoxFuture<'_, PushSubscription, PlatformError> {
        Box::pin(async { Err(PlatformError::Failed("push manager unavailable".to_string())) })
    }

    fn unsubscribe(&self) -> BoxFuture<'_, bool, PlatformError> {
        Box::pin(async { Ok(false) })
    }

    fn show_notification(&self, notification: DisplayNotification) -> BoxFuture<'_, (), PlatformError> {
        Box::pin(async move {
            info!(title = %notification.title, body = %notification.body, "notification");
            Ok(())
        })
    }
}
