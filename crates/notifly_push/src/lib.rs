// --- File: crates/notifly_push/src/lib.rs ---
pub mod error;
pub mod manager;
pub mod platform;
pub mod server;
pub mod toggle;
pub mod vapid;

pub use error::PushError;
pub use manager::PushSubscriptionManager;
pub use platform::{Capabilities, Permission, PlatformError, PushPlatform, SubscribeOptions};
pub use server::PushServerClient;
pub use toggle::{auto_subscribe, PushToggle, ToggleMessage, ToggleOutcome, ToggleState};
pub use vapid::decode_application_server_key;
