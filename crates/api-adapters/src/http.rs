//! REST client for the marketplace backend.
//!
//! One `reqwest::Client` serves every port. Non-2xx responses are decoded
//! from the backend's `{ "error": .. }` / `{ "message": .. }` body when
//! possible; 404 and 409 map to their dedicated [`AppError`] variants.

use std::time::Duration;

use async_trait::async_trait;
use domains::{
    AppError, ChatApi, ChatMessage, ChatSession, ContactApi, ContactMessage, ContactStatus, Domain,
    DomainCatalog, FileUpload, NewChatMessage, NewChatSession, NewContactMessage, NewOrder,
    NewSavedFilter, Order, OrderApi, OrderStatus, Result, SavedFilter, SavedFilterApi, UploadedFile,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

pub struct HttpMarketplaceClient {
    http: Client,
    base_url: Url,
    token: Option<SecretString>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Serialize)]
struct StatusUpdate<S> {
    status: S,
}

impl HttpMarketplaceClient {
    pub fn new(base_url: &str, timeout: Duration, token: Option<SecretString>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Validation(format!("invalid api base url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!("api base url '{base_url}' cannot carry paths")));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base_url, token })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `["api", "domains", id]` -> `{base}/api/domains/{id}`, each segment escaped.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(segments));
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let (client, request) = builder.build_split();
        let request = request.map_err(|e| AppError::Internal(e.to_string()))?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = client.execute(request).await.map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "request failed");
            AppError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%method, %url, status = status.as_u16(), "request ok");
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .unwrap_or_default();
        tracing::warn!(%method, %url, status = status.as_u16(), message = %message, "request rejected");
        Err(AppError::from_status(status.as_u16(), message))
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.execute(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AppError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DomainCatalog for HttpMarketplaceClient {
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        self.json(self.request(Method::GET, &["api", "domains"])).await
    }

    async fn get_domain(&self, id: &str) -> Result<Domain> {
        self.json(self.request(Method::GET, &["api", "domains", id])).await
    }

    async fn list_tlds(&self) -> Result<Vec<String>> {
        self.json(self.request(Method::GET, &["api", "domains", "tlds"])).await
    }
}

#[async_trait]
impl SavedFilterApi for HttpMarketplaceClient {
    async fn save_filter(&self, filter: NewSavedFilter) -> Result<SavedFilter> {
        self.json(self.request(Method::POST, &["api", "saved-filters"]).json(&filter))
            .await
    }

    async fn list_filters(&self, user_id: &str) -> Result<Vec<SavedFilter>> {
        let builder = self
            .request(Method::GET, &["api", "saved-filters"])
            .query(&[("userId", user_id)]);
        self.json(builder).await
    }

    async fn delete_filter(&self, id: &str) -> Result<()> {
        self.execute(self.request(Method::DELETE, &["api", "saved-filters", id]))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ChatApi for HttpMarketplaceClient {
    async fn create_session(&self, session: NewChatSession) -> Result<ChatSession> {
        self.json(self.request(Method::POST, &["api", "chat", "sessions"]).json(&session))
            .await
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        self.json(self.request(Method::GET, &["api", "chat", "sessions"])).await
    }

    async fn get_session(&self, id: &str) -> Result<ChatSession> {
        self.json(self.request(Method::GET, &["api", "chat", "sessions", id])).await
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let builder = self
            .request(Method::GET, &["api", "chat", "messages"])
            .query(&[("sessionId", session_id)]);
        self.json(builder).await
    }

    async fn send_message(&self, message: NewChatMessage) -> Result<ChatMessage> {
        self.json(self.request(Method::POST, &["api", "chat", "messages"]).json(&message))
            .await
    }

    async fn upload(&self, file: FileUpload) -> Result<UploadedFile> {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name)
            .mime_str(file.content_type.as_ref())
            .map_err(|e| AppError::Validation(format!("bad content type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        self.json(self.request(Method::POST, &["api", "chat", "upload"]).multipart(form))
            .await
    }
}

#[async_trait]
impl OrderApi for HttpMarketplaceClient {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        self.json(self.request(Method::POST, &["api", "orders"]).json(&order))
            .await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.json(self.request(Method::GET, &["api", "orders"])).await
    }

    async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<Order> {
        let builder = self
            .request(Method::PUT, &["api", "orders", id])
            .json(&StatusUpdate { status });
        self.json(builder).await
    }
}

#[async_trait]
impl ContactApi for HttpMarketplaceClient {
    async fn submit_contact(&self, message: NewContactMessage) -> Result<ContactMessage> {
        self.json(self.request(Method::POST, &["api", "contact"]).json(&message))
            .await
    }

    async fn list_contacts(&self) -> Result<Vec<ContactMessage>> {
        self.json(self.request(Method::GET, &["api", "contact"])).await
    }

    async fn update_contact_status(&self, id: &str, status: ContactStatus) -> Result<ContactMessage> {
        let builder = self
            .request(Method::PUT, &["api", "contact", id])
            .json(&StatusUpdate { status });
        self.json(builder).await
    }

    async fn delete_contact(&self, id: &str) -> Result<()> {
        self.execute(self.request(Method::DELETE, &["api", "contact", id]))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_escape_segments_and_keep_base_path() {
        let client = HttpMarketplaceClient::new("http://localhost:3000/shop/", Duration::from_secs(5), None).unwrap();
        assert_eq!(
            client.endpoint(&["api", "domains", "a b"]).as_str(),
            "http://localhost:3000/shop/api/domains/a%20b"
        );

        let client = HttpMarketplaceClient::new("http://localhost:3000", Duration::from_secs(5), None).unwrap();
        assert_eq!(
            client.endpoint(&["api", "chat", "sessions"]).as_str(),
            "http://localhost:3000/api/chat/sessions"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpMarketplaceClient::new("not a url", Duration::from_secs(5), None).is_err());
        assert!(HttpMarketplaceClient::new("mailto:ops@example.com", Duration::from_secs(5), None).is_err());
    }
}
