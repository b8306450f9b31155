//! Notification inbox: history, unread count reconciliation and the
//! combined realtime/push status.

pub mod api;
pub mod error;
pub mod service;
pub mod status;
pub mod unread;

pub use api::NotificationsApi;
pub use error::InboxError;
pub use service::InboxService;
pub use status::{
    ChannelProbe, IndicatorColor, MonitorHandle, NotificationStatus, PushProbe, StatusClass,
    StatusMonitor, StatusSnapshot,
};
pub use unread::{LoadSummary, UnreadReconciler};
