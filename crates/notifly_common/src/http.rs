// --- File: crates/notifly_common/src/http.rs ---
use http::StatusCode;
use reqwest::Response;

use crate::error::{external_service_error, NotiflyError};

pub mod client;

/// Formats a bearer `Authorization` header value.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Joins a base URL and an API path without doubling or dropping the slash.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turns a non-success response into a [`NotiflyError`], reading the body
/// as the message. Success responses are handed back untouched.
pub async fn ensure_success(response: Response, service_name: &str) -> Result<Response, NotiflyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NotiflyError::AuthError(message),
        StatusCode::NOT_FOUND => NotiflyError::NotFoundError(message),
        _ => external_service_error(service_name, status.as_u16(), message),
    })
}

/// Pulls `detail`, `message` or `error` out of a JSON error body, in that order.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://localhost:8000/", "/notifications/"),
            "http://localhost:8000/notifications/"
        );
        assert_eq!(
            join_url("http://localhost:8000", "vapid/public-key"),
            "http://localhost:8000/vapid/public-key"
        );
    }

    #[test]
    fn test_extract_error_message_prefers_detail() {
        assert_eq!(
            extract_error_message(r#"{"message":"m","detail":"d"}"#).as_deref(),
            Some("d")
        );
        assert_eq!(extract_error_message(r#"{"error":"e"}"#).as_deref(), Some("e"));
        assert_eq!(extract_error_message("not json"), None);
    }

    #[tokio::test]
    async fn test_ensure_success_maps_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/denied"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"detail":"Could not validate credentials"}"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let denied = client.get(format!("{}/denied", server.uri())).send().await.unwrap();
        match ensure_success(denied, "test").await {
            Err(NotiflyError::AuthError(msg)) => assert_eq!(msg, "Could not validate credentials"),
            other => panic!("unexpected result: {:?}", other.map(|r| r.status())),
        }

        let broken = client.get(format!("{}/broken", server.uri())).send().await.unwrap();
        match ensure_success(broken, "test").await {
            Err(NotiflyError::ExternalServiceError { status, .. }) => assert_eq!(status, 502),
            other => panic!("unexpected result: {:?}", other.map(|r| r.status())),
        }
    }
}
