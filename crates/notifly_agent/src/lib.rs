//! Background delivery agent.
//!
//! Installed once at [`notifly_config::AgentConfig::script_path`] and run by
//! the host independently of any page. It only talks to the page world
//! through the host: showing notifications and focusing or opening windows.

pub mod agent;
pub mod events;
pub mod host;

pub use agent::{AgentOutcome, BackgroundAgent, Lifecycle};
pub use events::{AgentEvent, PushPayload, ShownNotification};
pub use host::{AgentHost, HostError, WindowClient};
