// --- File: crates/notifly_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Wire models
pub mod services; // Service abstractions

pub use error::{external_service_error, NotiflyError};

pub use http::{
    bearer,
    client::{client_or_default, create_client, HTTP_CLIENT},
    ensure_success, join_url,
};

pub use logging::{init, init_with_level, log_error};

pub use models::{
    Actor, DisplayNotification, HistoryResponse, Notification, NotificationKind, PushSubscription,
    SubscriptionKeys, VapidKeyResponse,
};

pub use services::BoxFuture;
