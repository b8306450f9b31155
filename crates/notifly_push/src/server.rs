// --- File: crates/notifly_push/src/server.rs ---
use crate::error::PushError;
use notifly_common::{bearer, ensure_success, join_url, NotiflyError, PushSubscription, VapidKeyResponse};
use notifly_config::PushConfig;
use reqwest::{header, Client};
use tracing::{debug, info};

const SERVICE_NAME: &str = "push-subscriptions";

/// HTTP client for the server half of push registration.
#[derive(Clone)]
pub struct PushServerClient {
    client: Client,
    base_url: String,
    config: PushConfig,
}

impl PushServerClient {
    pub fn new(client: Client, base_url: impl Into<String>, config: PushConfig) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            config,
        }
    }

    /// `GET /vapid/public-key`. A missing or empty key is an error.
    pub async fn fetch_vapid_key(&self) -> Result<String, PushError> {
        let url = join_url(&self.base_url, &self.config.vapid_key_path);
        debug!(%url, "fetching VAPID public key");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PushError::KeyUnavailable(e.to_string()))?;
        let response = ensure_success(response, "vapid")
            .await
            .map_err(|e| PushError::KeyUnavailable(e.to_string()))?;
        let body: VapidKeyResponse = response
            .json()
            .await
            .map_err(|e| PushError::KeyUnavailable(e.to_string()))?;

        match body.public_key.map(|k| k.trim().to_string()) {
            Some(key) if !key.is_empty() => {
                info!(length = key.len(), "VAPID public key received");
                Ok(key)
            }
            _ => Err(PushError::KeyUnavailable(
                "VAPID public key not configured on server".to_string(),
            )),
        }
    }

    /// `POST /push-subscriptions/`. The server upserts by endpoint.
    pub async fn register(&self, subscription: &PushSubscription, token: &str) -> Result<(), PushError> {
        let url = join_url(&self.base_url, &self.config.subscriptions_path);
        let request = self.client.post(&url);
        self.send(request, subscription, token).await?;
        info!(endpoint = %subscription.endpoint, "push subscription registered");
        Ok(())
    }

    /// `DELETE /push-subscriptions/` with the registered subscription as body.
    pub async fn unregister(&self, subscription: &PushSubscription, token: &str) -> Result<(), PushError> {
        let url = join_url(&self.base_url, &self.config.subscriptions_path);
        let request = self.client.delete(&url);
        self.send(request, subscription, token).await?;
        info!(endpoint = %subscription.endpoint, "push subscription removed");
        Ok(())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        subscription: &PushSubscription,
        token: &str,
    ) -> Result<(), PushError> {
        let response = request
            .header(header::AUTHORIZATION, bearer(token))
            .json(subscription)
            .send()
            .await
            .map_err(|e| PushError::ServerSync(NotiflyError::from(e)))?;
        ensure_success(response, SERVICE_NAME)
            .await
            .map_err(PushError::ServerSync)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::subscription;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PushServerClient {
        PushServerClient::new(Client::new(), server.uri(), PushConfig::default())
    }

    #[tokio::test]
    async fn test_fetch_vapid_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vapid/public-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"public_key": " BKey \n"})))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).fetch_vapid_key().await.unwrap(), "BKey");
    }

    #[tokio::test]
    async fn test_empty_vapid_key_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vapid/public-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"public_key": ""})))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_vapid_key().await.unwrap_err();
        assert!(matches!(err, PushError::KeyUnavailable(_)));
        assert!(err.is_vapid());
    }

    #[tokio::test]
    async fn test_register_sends_bearer_and_browser_json() {
        let server = MockServer::start().await;
        let sub = subscription("https://push.example.com/send/1");
        Mock::given(method("POST"))
            .and(path("/push-subscriptions/"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(serde_json::to_value(&sub).unwrap()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).register(&sub, "tok").await.unwrap();
    }

    #[tokio::test]
    async fn test_unregister_failure_is_server_sync() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/push-subscriptions/"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"detail": "db down"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .unregister(&subscription("https://push.example.com/send/1"), "tok")
            .await
            .unwrap_err();
        let PushError::ServerSync(inner) = err else {
            panic!("expected ServerSync");
        };
        assert!(inner.to_string().contains("db down"));
    }
}
