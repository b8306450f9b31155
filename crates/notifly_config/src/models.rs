// --- File: crates/notifly_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- Backend Server ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the social API and of the realtime endpoint.
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// Transport the realtime channel may use, in order of preference.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Polling,
    Websocket,
}

// --- Realtime Channel ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Handshake path, e.g. `/socket.io/`.
    pub path: String,
    /// Start with the first transport, upgrade to the next when offered.
    pub transports: Vec<TransportKind>,
    pub reconnection: bool,
    pub reconnection_attempts: u32,
    pub reconnection_delay_ms: u64,
    pub reconnection_delay_max_ms: u64,
    /// Handshake timeout.
    pub timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            path: "/socket.io/".to_string(),
            transports: vec![TransportKind::Polling, TransportKind::Websocket],
            reconnection: true,
            reconnection_attempts: 5,
            reconnection_delay_ms: 1_000,
            reconnection_delay_max_ms: 5_000,
            timeout_ms: 20_000,
        }
    }
}

// --- Push Subscription ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PushConfig {
    pub vapid_key_path: String,
    pub subscriptions_path: String,
    /// Icon used by the local test notification.
    pub icon: String,
    pub badge: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_key_path: "/vapid/public-key".to_string(),
            subscriptions_path: "/push-subscriptions/".to_string(),
            icon: "/vite.svg".to_string(),
            badge: "/vite.svg".to_string(),
        }
    }
}

// --- Background Delivery Agent ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// Well-known path the agent script is installed at.
    pub script_path: String,
    /// Route opened when a notification is clicked and no window is open.
    pub click_route: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            script_path: "/service-worker.js".to_string(),
            click_route: "/notifications".to_string(),
            icon: "/vite.svg".to_string(),
            badge: "/vite.svg".to_string(),
            vibrate: vec![200, 100, 200],
        }
    }
}

// --- Status Aggregation ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StatusConfig {
    pub poll_interval_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
        }
    }
}

// --- HTTP Client ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

// --- Session ---
// Holds the bearer token of the running session. Usually left out of the
// config file and provided as "secret_from_env" or NOTIFLY_SECRET_SESSION_ACCESS_TOKEN.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub access_token: Option<String>,
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub session: SessionConfig,
}
