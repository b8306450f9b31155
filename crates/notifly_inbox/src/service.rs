// --- File: crates/notifly_inbox/src/service.rs ---
use crate::api::NotificationsApi;
use crate::error::InboxError;
use crate::unread::{LoadSummary, UnreadReconciler};
use notifly_common::Notification;
use notifly_config::AppConfig;
use notifly_realtime::{ChannelClient, ChannelEvent, Listener, EVENT_NOTIFICATION};
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};

struct Shared {
    reconciler: Mutex<UnreadReconciler>,
    unread: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, UnreadReconciler> {
        self.reconciler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut UnreadReconciler) -> R) -> R {
        let mut reconciler = self.lock();
        let result = f(&mut reconciler);
        let count = reconciler.unread_count();
        drop(reconciler);
        self.unread.send_if_modified(|current| {
            let changed = *current != count;
            *current = count;
            changed
        });
        result
    }
}

/// Notification history for one session, kept in step with the server
/// and with live channel events.
pub struct InboxService {
    api: NotificationsApi,
    shared: Arc<Shared>,
    listener: Mutex<Option<Listener>>,
}

impl InboxService {
    pub fn new(api: NotificationsApi) -> Self {
        let (unread, _) = watch::channel(0);
        Self {
            api,
            shared: Arc::new(Shared {
                reconciler: Mutex::new(UnreadReconciler::new()),
                unread,
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AppConfig, http: Client, token: impl Into<String>) -> Self {
        Self::new(NotificationsApi::new(http, config.server.base_url.clone(), token))
    }

    /// Fetches history and replaces the local list with it, keeping live
    /// notifications that arrived after the server built its response.
    pub async fn load(&self) -> Result<LoadSummary, InboxError> {
        let history = self.api.list().await?;
        let summary = self.shared.update(|r| r.load(history));
        info!(
            unread = self.unread_count(),
            records = self.shared.lock().records().len(),
            "notification history loaded"
        );
        Ok(summary)
    }

    pub async fn mark_read(&self, id: i64) -> Result<(), InboxError> {
        self.api.mark_read(id).await?;
        self.shared.update(|r| r.mark_read(id));
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<(), InboxError> {
        self.api.mark_all_read().await?;
        self.shared.update(|r| r.mark_all_read());
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<Option<Notification>, InboxError> {
        self.api.delete(id).await?;
        Ok(self.shared.update(|r| r.remove(id)))
    }

    /// Applies a notification pushed over the channel.
    pub fn apply_live(&self, notification: Notification) -> bool {
        self.shared.update(|r| r.apply_live(notification))
    }

    /// Feeds the channel's notification events into this inbox. Calling it
    /// again replaces nothing; the same listener stays registered.
    pub fn attach(&self, channel: &ChannelClient) -> Listener {
        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        let listener = slot
            .get_or_insert_with(|| {
                let shared = Arc::clone(&self.shared);
                Listener::new(move |event| {
                    if let ChannelEvent::Notification(notification) = event {
                        let applied = shared.update(|r| r.apply_live(notification.clone()));
                        debug!(id = notification.id, applied, "live notification");
                    }
                })
            })
            .clone();
        channel.on(EVENT_NOTIFICATION, &listener);
        listener
    }

    pub fn detach(&self, channel: &ChannelClient) -> bool {
        let slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(listener) => channel.off(EVENT_NOTIFICATION, listener),
            None => false,
        }
    }

    pub fn unread_count(&self) -> u64 {
        *self.shared.unread.borrow()
    }

    pub fn watch_unread(&self) -> watch::Receiver<u64> {
        self.shared.unread.subscribe()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.shared.lock().records().to_vec()
    }
}
