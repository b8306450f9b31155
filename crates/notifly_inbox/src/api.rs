// --- File: crates/notifly_inbox/src/api.rs ---
use crate::error::InboxError;
use notifly_common::{bearer, ensure_success, join_url, HistoryResponse};
use reqwest::{header, Client, RequestBuilder};
use tracing::debug;

const SERVICE_NAME: &str = "notifications";

/// Client for the notification history and read-state endpoints.
#[derive(Clone)]
pub struct NotificationsApi {
    client: Client,
    base_url: String,
    token: String,
}

impl NotificationsApi {
    pub fn new(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, bearer(&self.token))
    }

    /// `GET /notifications/`, either response shape.
    pub async fn list(&self) -> Result<HistoryResponse, InboxError> {
        let url = join_url(&self.base_url, "/notifications/");
        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = ensure_success(response, SERVICE_NAME).await?;
        let history = response.json::<HistoryResponse>().await?;
        Ok(history)
    }

    /// `PUT /notifications/{id}/read`
    pub async fn mark_read(&self, id: i64) -> Result<(), InboxError> {
        let url = join_url(&self.base_url, &format!("/notifications/{id}/read"));
        self.execute(self.client.put(&url)).await
    }

    /// `PUT /notifications/read-all`
    pub async fn mark_all_read(&self) -> Result<(), InboxError> {
        let url = join_url(&self.base_url, "/notifications/read-all");
        self.execute(self.client.put(&url)).await
    }

    /// `DELETE /notifications/{id}`
    pub async fn delete(&self, id: i64) -> Result<(), InboxError> {
        let url = join_url(&self.base_url, &format!("/notifications/{id}"));
        self.execute(self.client.delete(&url)).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), InboxError> {
        let response = self.authorized(request).send().await?;
        let response = ensure_success(response, SERVICE_NAME).await?;
        debug!(status = %response.status(), "notifications call succeeded");
        Ok(())
    }
}
