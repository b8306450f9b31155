//! Combined notification status.
//!
//! Folds the channel's connection state and the push subscription state into
//! one of five classes for display. [`StatusMonitor`] keeps the result
//! current: it recomputes on a fixed interval, and immediately whenever the
//! channel reports a connect or a disconnect.

use notifly_config::StatusConfig;
use notifly_push::PushSubscriptionManager;
use notifly_realtime::{ChannelClient, Listener, EVENT_CONNECT, EVENT_DISCONNECT};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NotificationStatus {
    pub channel_connected: bool,
    pub push_enabled: bool,
    pub push_supported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    FullyActive,
    LiveOnly,
    PushOnly,
    DisabledActionable,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    Green,
    Blue,
    Orange,
    Gray,
}

impl NotificationStatus {
    /// First matching rule wins.
    pub fn classify(&self) -> StatusClass {
        match (self.channel_connected, self.push_enabled, self.push_supported) {
            (true, true, _) => StatusClass::FullyActive,
            (true, false, _) => StatusClass::LiveOnly,
            (false, true, _) => StatusClass::PushOnly,
            (false, false, true) => StatusClass::DisabledActionable,
            (false, false, false) => StatusClass::Unsupported,
        }
    }
}

impl StatusClass {
    pub fn color(&self) -> IndicatorColor {
        match self {
            StatusClass::FullyActive => IndicatorColor::Green,
            StatusClass::LiveOnly => IndicatorColor::Blue,
            StatusClass::PushOnly => IndicatorColor::Orange,
            StatusClass::DisabledActionable | StatusClass::Unsupported => IndicatorColor::Gray,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            StatusClass::FullyActive => "Real-time and Push notifications active",
            StatusClass::LiveOnly => {
                "Real-time notifications active (enable push for offline notifications)"
            }
            StatusClass::PushOnly => "Push notifications active (real-time disconnected)",
            StatusClass::DisabledActionable => "Notifications disabled (click to enable)",
            StatusClass::Unsupported => "Push notifications not supported in this browser",
        }
    }

    /// Whether the user can act on this state by enabling push.
    pub fn is_actionable(&self) -> bool {
        matches!(self, StatusClass::DisabledActionable)
    }
}

/// A status together with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status: NotificationStatus,
    pub class: StatusClass,
}

impl From<NotificationStatus> for StatusSnapshot {
    fn from(status: NotificationStatus) -> Self {
        Self {
            status,
            class: status.classify(),
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        NotificationStatus::default().into()
    }
}

pub trait ChannelProbe: Send + Sync {
    fn channel_connected(&self) -> bool;
}

pub trait PushProbe: Send + Sync {
    fn push_supported(&self) -> bool;
    fn push_enabled(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

impl ChannelProbe for ChannelClient {
    fn channel_connected(&self) -> bool {
        self.is_connected()
    }
}

impl PushProbe for PushSubscriptionManager {
    fn push_supported(&self) -> bool {
        self.is_supported()
    }

    fn push_enabled(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(self.is_subscribed())
    }
}

pub struct StatusMonitor {
    channel: Arc<dyn ChannelProbe>,
    push: Arc<dyn PushProbe>,
    interval: Duration,
    sender: watch::Sender<StatusSnapshot>,
}

impl StatusMonitor {
    pub fn new(channel: Arc<dyn ChannelProbe>, push: Arc<dyn PushProbe>, config: &StatusConfig) -> Self {
        let (sender, _) = watch::channel(StatusSnapshot::default());
        Self {
            channel,
            push,
            interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            sender,
        }
    }

    /// Reads both probes and publishes the result if it changed.
    pub async fn refresh(&self) -> StatusSnapshot {
        let status = NotificationStatus {
            channel_connected: self.channel.channel_connected(),
            push_enabled: self.push.push_enabled().await,
            push_supported: self.push.push_supported(),
        };
        let snapshot = StatusSnapshot::from(status);

        let changed = self.sender.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
        if changed {
            info!(class = ?snapshot.class, "{}", snapshot.class.text());
        }
        snapshot
    }

    pub fn current(&self) -> StatusSnapshot {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.sender.subscribe()
    }

    /// Starts the refresh loop on the current runtime. The first refresh
    /// runs immediately.
    pub fn spawn(self: Arc<Self>) -> MonitorHandle {
        let wake = Arc::new(Notify::new());
        let task_wake = Arc::clone(&wake);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = task_wake.notified() => debug!("status refresh requested"),
                }
                self.refresh().await;
            }
        });
        let weak = Arc::downgrade(&wake);
        let trigger = Listener::new(move |_| {
            if let Some(wake) = weak.upgrade() {
                wake.notify_one();
            }
        });
        MonitorHandle {
            task,
            wake,
            trigger,
        }
    }
}

/// Running refresh loop. Dropping the handle stops it.
pub struct MonitorHandle {
    task: JoinHandle<()>,
    wake: Arc<Notify>,
    trigger: Listener,
}

impl MonitorHandle {
    /// Requests an immediate refresh.
    pub fn refresh_now(&self) {
        self.wake.notify_one();
    }

    /// Refreshes whenever `channel` connects or disconnects.
    pub fn watch_channel(&self, channel: &ChannelClient) {
        channel.on(EVENT_CONNECT, &self.trigger);
        channel.on(EVENT_DISCONNECT, &self.trigger);
    }

    pub fn unwatch_channel(&self, channel: &ChannelClient) {
        channel.off(EVENT_CONNECT, &self.trigger);
        channel.off(EVENT_DISCONNECT, &self.trigger);
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
