use notifly_common::NotiflyError;
use thiserror::Error;

/// Failures of the push subscription lifecycle.
///
/// `Unsupported`, `PermissionDenied` and `InvalidKey` are permanent and
/// never retried. `ServerSync` is surfaced to the caller as is.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push notifications are not supported in this browser")]
    Unsupported,

    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Notification permission not granted")]
    PermissionNotGranted,

    /// The key has the wrong shape or the platform rejected it
    #[error("Invalid VAPID public key: {0}")]
    InvalidKey(String),

    /// The server did not hand out a key
    #[error("Could not retrieve VAPID public key from server: {0}")]
    KeyUnavailable(String),

    /// Registering or removing the subscription on the server failed
    #[error("Push subscription sync failed: {0}")]
    ServerSync(#[source] NotiflyError),

    /// The platform push manager failed for another reason
    #[error("Push platform error: {0}")]
    Platform(String),
}

impl PushError {
    pub fn is_permission(&self) -> bool {
        matches!(self, PushError::PermissionDenied | PushError::PermissionNotGranted)
    }

    pub fn is_vapid(&self) -> bool {
        matches!(self, PushError::InvalidKey(_) | PushError::KeyUnavailable(_))
    }

    /// A server call that never got an answer: connection failure or timeout.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PushError::ServerSync(NotiflyError::HttpError(_) | NotiflyError::TimeoutError(_))
        )
    }
}
