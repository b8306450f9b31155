// File: services/notifly_session/src/main.rs
use notifly_common::{client_or_default, logging};
use notifly_config::{env_vars, load_config, AppConfig};
use notifly_inbox::{InboxService, StatusMonitor};
use notifly_push::{auto_subscribe, PushSubscriptionManager};
use notifly_realtime::{ChannelClient, ChannelEvent, Listener, EVENT_NOTIFICATION};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

mod platform;

use platform::HeadlessPlatform;

/// Token from the config file, or from the secret environment variables
/// when the file leaves it out or only carries the marker.
fn access_token(config: &AppConfig) -> Option<String> {
    config
        .session
        .access_token
        .clone()
        .filter(|token| !token.is_empty() && token != "secret_from_env")
        .or_else(|| env_vars::get_secret_env_var("session.access_token"))
        .filter(|token| !token.is_empty())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            return ExitCode::FAILURE;
        }
    };
    logging::init();

    let Some(token) = access_token(&config) else {
        error!("no access token; set session.access_token or NOTIFLY_SECRET_SESSION_ACCESS_TOKEN");
        return ExitCode::FAILURE;
    };

    let http = client_or_default(config.http.timeout_secs);
    info!(server = %config.server.base_url, "starting notification session");

    let channel = Arc::new(ChannelClient::from_config(&config, http.clone()));
    let push = Arc::new(PushSubscriptionManager::from_config(
        Arc::new(HeadlessPlatform),
        &config,
        http.clone(),
    ));
    let inbox = InboxService::from_config(&config, http, token.clone());

    let log_listener = Listener::new(|event| {
        if let ChannelEvent::Notification(notification) = event {
            info!(id = notification.id, kind = ?notification.kind, "{}", notification.display_message());
        }
    });
    channel.on(EVENT_NOTIFICATION, &log_listener);
    inbox.attach(&channel);
    channel.connect(&token);

    if !auto_subscribe(&push, &token).await {
        info!("push notifications not active for this session");
    }

    match inbox.load().await {
        Ok(summary) if summary.diverges() => {
            warn!(local = summary.local_count, "using the server's unread count")
        }
        Ok(_) => {}
        Err(err) => logging::log_error(err, "failed to load notification history"),
    }

    let monitor = Arc::new(StatusMonitor::new(channel.clone(), push.clone(), &config.status));
    let handle = Arc::clone(&monitor).spawn();
    handle.watch_channel(&channel);

    let mut unread = inbox.watch_unread();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(err) = result {
                    logging::log_error(err, "failed to listen for ctrl-c");
                }
                break;
            }
            changed = unread.changed() => {
                if changed.is_err() {
                    break;
                }
                info!(unread = *unread.borrow_and_update(), "unread count changed");
            }
        }
    }

    info!("shutting down notification session");
    handle.stop();
    channel.disconnect();
    ExitCode::SUCCESS
}
