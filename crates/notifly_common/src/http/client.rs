// --- File: crates/notifly_common/src/http/client.rs ---
use once_cell::sync::Lazy;
use reqwest::{Client, Error as ReqwestError};
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A process-wide HTTP client with the default timeout.
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
});

/// Creates a new HTTP client with the given request timeout.
pub fn create_client(timeout_secs: u64) -> Result<Client, ReqwestError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Creates a client with the given timeout, falling back to the shared
/// [`HTTP_CLIENT`] if the builder fails.
pub fn client_or_default(timeout_secs: u64) -> Client {
    match create_client(timeout_secs) {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(error = %err, "failed to build HTTP client, using the shared one");
            HTTP_CLIENT.clone()
        }
    }
}
