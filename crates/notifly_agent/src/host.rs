// --- File: crates/notifly_agent/src/host.rs ---
//! What the hosting runtime offers the agent: lifecycle control, system
//! notifications and window-client enumeration.

use notifly_common::{BoxFuture, DisplayNotification};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("host operation failed: {0}")]
    Failed(String),

    #[error("operation not supported by host: {0}")]
    Unsupported(&'static str),
}

/// An open page of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focusable: bool,
}

pub trait AgentHost: Send + Sync {
    /// Origin the agent was installed from, e.g. `https://social.example.com`.
    fn origin(&self) -> String;

    fn skip_waiting(&self) -> BoxFuture<'_, (), HostError>;

    fn claim_clients(&self) -> BoxFuture<'_, (), HostError>;

    fn show_notification(&self, notification: DisplayNotification) -> BoxFuture<'_, (), HostError>;

    fn close_notification(&self, notification_id: String) -> BoxFuture<'_, (), HostError>;

    /// All window clients, including ones this agent does not control yet.
    fn match_clients(&self) -> BoxFuture<'_, Vec<WindowClient>, HostError>;

    fn focus_client(&self, client_id: String) -> BoxFuture<'_, (), HostError>;

    fn open_window(&self, url: String) -> BoxFuture<'_, (), HostError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every host call, in order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum HostCall {
        SkipWaiting,
        Claim,
        Show(DisplayNotification),
        Close(String),
        MatchClients,
        Focus(String),
        Open(String),
    }

    pub struct MockHost {
        origin: String,
        pub clients: Mutex<Vec<WindowClient>>,
        pub calls: Mutex<Vec<HostCall>>,
        pub fail_show: Mutex<bool>,
        pub fail_match: Mutex<bool>,
    }

    impl MockHost {
        pub fn new(origin: &str) -> Self {
            Self {
                origin: origin.to_string(),
                clients: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                fail_show: Mutex::new(false),
                fail_match: Mutex::new(false),
            }
        }

        pub fn with_client(self, id: &str, url: &str, focusable: bool) -> Self {
            self.clients.lock().unwrap().push(WindowClient {
                id: id.to_string(),
                url: url.to_string(),
                focusable,
            });
            self
        }

        pub fn calls(&self) -> Vec<HostCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn shown(&self) -> Vec<DisplayNotification> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    HostCall::Show(n) => Some(n),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: HostCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl AgentHost for MockHost {
        fn origin(&self) -> String {
            self.origin.clone()
        }

        fn skip_waiting(&self) -> BoxFuture<'_, (), HostError> {
            Box::pin(async move {
                self.record(HostCall::SkipWaiting);
                Ok(())
            })
        }

        fn claim_clients(&self) -> BoxFuture<'_, (), HostError> {
            Box::pin(async move {
                self.record(HostCall::Claim);
                Ok(())
            })
        }

        fn show_notification(&self, notification: DisplayNotification) -> BoxFuture<'_, (), HostError> {
            Box::pin(async move {
                self.record(HostCall::Show(notification));
                if *self.fail_show.lock().unwrap() {
                    return Err(HostError::Failed("quota exceeded".into()));
                }
                Ok(())
            })
        }

        fn close_notification(&self, notification_id: String) -> BoxFuture<'_, (), HostError> {
            Box::pin(async move {
                self.record(HostCall::Close(notification_id));
                Ok(())
            })
        }

        fn match_clients(&self) -> BoxFuture<'_, Vec<WindowClient>, HostError> {
            Box::pin(async move {
                self.record(HostCall::MatchClients);
                if *self.fail_match.lock().unwrap() {
                    return Err(HostError::Failed("clients unavailable".into()));
                }
                Ok(self.clients.lock().unwrap().clone())
            })
        }

        fn focus_client(&self, client_id: String) -> BoxFuture<'_, (), HostError> {
            Box::pin(async move {
                self.record(HostCall::Focus(client_id));
                Ok(())
            })
        }

        fn open_window(&self, url: String) -> BoxFuture<'_, (), HostError> {
            Box::pin(async move {
                self.record(HostCall::Open(url));
                Ok(())
            })
        }
    }
}
