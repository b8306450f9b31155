// --- File: crates/notifly_agent/src/agent.rs ---

use crate::events::{AgentEvent, PushPayload, ShownNotification};
use crate::host::{AgentHost, WindowClient};
use notifly_common::DisplayNotification;
use notifly_config::AgentConfig;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const FALLBACK_TITLE: &str = "New Notification";
const FALLBACK_BODY: &str = "You have a new notification";
const FALLBACK_TAG: &str = "notification";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Parsed,
    Installed,
    Active,
}

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    Installed,
    Activated,
    Shown { tag: String },
    /// The payload was missing or unreadable; the generic notification was shown.
    FallbackShown,
    Focused { client_id: String },
    Opened { url: String },
    Closed,
    Passthrough,
    /// The step failed and was logged.
    Failed,
}

/// Receives pushes while no page runs, renders them and routes clicks.
pub struct BackgroundAgent {
    host: Arc<dyn AgentHost>,
    config: AgentConfig,
    lifecycle: Mutex<Lifecycle>,
}

impl BackgroundAgent {
    pub fn new(host: Arc<dyn AgentHost>, config: AgentConfig) -> Self {
        info!(script = %config.script_path, "background agent loaded");
        Self {
            host,
            config,
            lifecycle: Mutex::new(Lifecycle::Parsed),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Handles one event. Never fails: host errors are logged and reported
    /// as [`AgentOutcome::Failed`].
    pub async fn handle(&self, event: AgentEvent) -> AgentOutcome {
        match event {
            AgentEvent::Install => self.on_install().await,
            AgentEvent::Activate => self.on_activate().await,
            AgentEvent::Push { data } => self.on_push(data).await,
            AgentEvent::NotificationClick { notification } => self.on_click(notification).await,
            AgentEvent::NotificationClose { notification } => {
                info!(id = %notification.id, tag = ?notification.tag, "notification closed");
                AgentOutcome::Closed
            }
            AgentEvent::Fetch { url } => {
                debug!(%url, "fetch passed through");
                AgentOutcome::Passthrough
            }
        }
    }

    /// Processes events one at a time until the sender side closes.
    pub fn spawn(self: Arc<Self>, mut events: mpsc::Receiver<AgentEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle(event).await;
            }
            debug!("agent event stream closed");
        })
    }

    async fn on_install(&self) -> AgentOutcome {
        info!("background agent installing");
        // always run the newest version
        if let Err(e) = self.host.skip_waiting().await {
            error!(error = %e, "skip_waiting failed");
            return AgentOutcome::Failed;
        }
        self.set_lifecycle(Lifecycle::Installed);
        AgentOutcome::Installed
    }

    async fn on_activate(&self) -> AgentOutcome {
        info!("background agent activating");
        if let Err(e) = self.host.claim_clients().await {
            error!(error = %e, "claiming clients failed");
            return AgentOutcome::Failed;
        }
        self.set_lifecycle(Lifecycle::Active);
        info!("background agent activated and claimed clients");
        AgentOutcome::Activated
    }

    async fn on_push(&self, data: Option<Vec<u8>>) -> AgentOutcome {
        info!("push message received");
        let Some(raw) = data else {
            warn!("push event without data");
            return self.show_fallback(true).await;
        };

        let payload = match PushPayload::parse(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "error parsing push data");
                return self.show_fallback(false).await;
            }
        };

        let tag = payload
            .notification_id()
            .unwrap_or_else(|| FALLBACK_TAG.to_string());
        let notification = DisplayNotification {
            title: non_empty(payload.title).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            body: non_empty(payload.body).unwrap_or_else(|| FALLBACK_BODY.to_string()),
            icon: Some(self.config.icon.clone()),
            badge: Some(self.config.badge.clone()),
            tag: Some(tag.clone()),
            vibrate: self.config.vibrate.clone(),
            require_interaction: false,
            data: Some(payload.data.unwrap_or_else(|| Value::Object(Default::default()))),
        };

        debug!(title = %notification.title, %tag, "showing notification");
        match self.host.show_notification(notification).await {
            Ok(()) => {
                info!(%tag, "notification displayed");
                AgentOutcome::Shown { tag }
            }
            Err(e) => {
                error!(error = %e, "failed to show notification");
                AgentOutcome::Failed
            }
        }
    }

    async fn show_fallback(&self, with_badge: bool) -> AgentOutcome {
        let notification = DisplayNotification {
            title: FALLBACK_TITLE.to_string(),
            body: FALLBACK_BODY.to_string(),
            icon: Some(self.config.icon.clone()),
            badge: with_badge.then(|| self.config.badge.clone()),
            ..DisplayNotification::default()
        };
        match self.host.show_notification(notification).await {
            Ok(()) => AgentOutcome::FallbackShown,
            Err(e) => {
                error!(error = %e, "failed to show fallback notification");
                AgentOutcome::Failed
            }
        }
    }

    async fn on_click(&self, notification: ShownNotification) -> AgentOutcome {
        info!(id = %notification.id, "notification clicked");
        if let Err(e) = self.host.close_notification(notification.id.clone()).await {
            warn!(error = %e, "closing clicked notification failed");
        }

        let origin = self.host.origin();
        let clients = match self.host.match_clients().await {
            Ok(clients) => clients,
            Err(e) => {
                warn!(error = %e, "could not enumerate clients, opening a new window");
                Vec::new()
            }
        };

        if let Some(client) = clients
            .into_iter()
            .find(|c| c.focusable && same_origin(c, &origin))
        {
            return match self.host.focus_client(client.id.clone()).await {
                Ok(()) => AgentOutcome::Focused { client_id: client.id },
                Err(e) => {
                    error!(error = %e, "focusing client failed");
                    AgentOutcome::Failed
                }
            };
        }

        let url = self.config.click_route.clone();
        match self.host.open_window(url.clone()).await {
            Ok(()) => AgentOutcome::Opened { url },
            Err(e) => {
                error!(error = %e, "opening window failed");
                AgentOutcome::Failed
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn same_origin(client: &WindowClient, origin: &str) -> bool {
    let origin = origin.trim_end_matches('/');
    match client.url.strip_prefix(origin) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('#'),
        None => false,
    }
}
