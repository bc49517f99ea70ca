//! # integration-tests
//!
//! An in-process fake of the marketplace backend, served by axum on an
//! ephemeral port. The tests drive the real `HttpMarketplaceClient` and the
//! services against it, optionally with an [`InProcessPushHub`] standing in
//! for the pub/sub service the backend triggers on every chat write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use api_adapters::{HttpMarketplaceClient, InProcessPushHub};
use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use domains::{
    session_channel, ChatMessage, ChatSession, ContactMessage, ContactStatus, Domain, DomainMetrics,
    MessageType, NewChatMessage, NewChatSession, NewContactMessage, NewOrder, NewSavedFilter, Order,
    OrderStatus, PushEvent, SavedFilter, SenderRole, SessionStatus, ADMINS_CHANNEL, ADMIN_CHANNEL,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One multipart upload the backend accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Default)]
struct Data {
    domains: Vec<Domain>,
    saved_filters: Vec<SavedFilter>,
    sessions: Vec<ChatSession>,
    messages: Vec<ChatMessage>,
    orders: Vec<Order>,
    contacts: Vec<ContactMessage>,
    uploads: Vec<RecordedUpload>,
    fail_sends: bool,
    last_authorization: Option<String>,
    next_id: u64,
}

impl Data {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

struct Backend {
    data: Mutex<Data>,
    push: Option<Arc<InProcessPushHub>>,
}

impl Backend {
    fn data(&self) -> MutexGuard<'_, Data> {
        match self.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn publish(&self, channel: &str, event: PushEvent) {
        if let Some(hub) = &self.push {
            hub.publish(channel, event);
        }
    }
}

type Shared = Arc<Backend>;

pub struct FakeBackend {
    base_url: String,
    backend: Shared,
    server: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeBackend {
    pub async fn start() -> anyhow::Result<Self> {
        Self::spawn(None).await
    }

    /// Like [`FakeBackend::start`], but chat writes are also published on
    /// `hub` the way the production backend triggers its pub/sub service.
    pub async fn with_push(hub: Arc<InProcessPushHub>) -> anyhow::Result<Self> {
        Self::spawn(Some(hub)).await
    }

    async fn spawn(push: Option<Arc<InProcessPushHub>>) -> anyhow::Result<Self> {
        let backend = Arc::new(Backend {
            data: Mutex::new(Data::default()),
            push,
        });
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let app = router(backend.clone());
        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                eprintln!("fake backend stopped: {err}");
            }
        });
        Ok(Self {
            base_url,
            backend,
            server,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> anyhow::Result<HttpMarketplaceClient> {
        self.client_with_token(None)
    }

    pub fn client_with_token(&self, token: Option<SecretString>) -> anyhow::Result<HttpMarketplaceClient> {
        Ok(HttpMarketplaceClient::new(&self.base_url, Duration::from_secs(5), token)?)
    }

    pub fn seed_domains(&self, domains: Vec<Domain>) {
        self.backend.data().domains = domains;
    }

    /// Makes every chat message write fail with a 500 until reset.
    pub fn fail_sends(&self, fail: bool) {
        self.backend.data().fail_sends = fail;
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.backend.data().uploads.clone()
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        self.backend.data().sessions.clone()
    }

    pub fn messages(&self, session_id: &str) -> Vec<ChatMessage> {
        self.backend
            .data()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.backend.data().orders.clone()
    }

    pub fn contacts(&self) -> Vec<ContactMessage> {
        self.backend.data().contacts.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.backend.data().last_authorization.clone()
    }
}

/// A listed domain with no metrics; tests fill in what they filter on.
pub fn domain(id: &str, name: &str, price: f64) -> Domain {
    Domain {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        registrar: None,
        tags: Vec::new(),
        image: Vec::new(),
        price,
        actual_price: None,
        is_available: true,
        is_sold: false,
        is_hot: false,
        featured: false,
        domain_type: None,
        metrics: DomainMetrics::default(),
        created_at: None,
    }
}

fn router(backend: Shared) -> Router {
    Router::new()
        .route("/api/domains", get(list_domains))
        .route("/api/domains/tlds", get(list_tlds))
        .route("/api/domains/{id}", get(get_domain))
        .route("/api/saved-filters", get(list_filters).post(save_filter))
        .route("/api/saved-filters/{id}", delete(delete_filter))
        .route("/api/chat/sessions", get(list_sessions).post(create_session))
        .route("/api/chat/sessions/{id}", get(get_session))
        .route("/api/chat/messages", get(list_messages).post(send_message))
        .route("/api/chat/upload", post(upload))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", put(update_order))
        .route("/api/contact", get(list_contacts).post(submit_contact))
        .route("/api/contact/{id}", put(update_contact).delete(delete_contact))
        .layer(middleware::from_fn_with_state(backend.clone(), record_authorization))
        .with_state(backend)
}

fn reject(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

async fn record_authorization(State(backend): State<Shared>, request: Request, next: Next) -> Response {
    let auth = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    backend.data().last_authorization = auth;
    next.run(request).await
}

async fn list_domains(State(backend): State<Shared>) -> Json<Vec<Domain>> {
    Json(backend.data().domains.clone())
}

async fn list_tlds(State(backend): State<Shared>) -> Json<Vec<String>> {
    let mut tlds: Vec<String> = backend.data().domains.iter().filter_map(Domain::tld).collect();
    tlds.sort();
    tlds.dedup();
    Json(tlds)
}

async fn get_domain(State(backend): State<Shared>, Path(id): Path<String>) -> Response {
    match backend.data().domains.iter().find(|d| d.id == id) {
        Some(domain) => Json(domain.clone()).into_response(),
        None => reject(StatusCode::NOT_FOUND, "Domain not found"),
    }
}

async fn list_filters(State(backend): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Response {
    let Some(user_id) = params.get("userId") else {
        return reject(StatusCode::BAD_REQUEST, "userId is required");
    };
    let filters: Vec<SavedFilter> = backend
        .data()
        .saved_filters
        .iter()
        .filter(|f| &f.user_id == user_id)
        .cloned()
        .collect();
    Json(filters).into_response()
}

async fn save_filter(State(backend): State<Shared>, Json(body): Json<NewSavedFilter>) -> Response {
    let mut data = backend.data();
    let taken = data
        .saved_filters
        .iter()
        .any(|f| f.user_id == body.user_id && f.name == body.name);
    if taken {
        return reject(StatusCode::CONFLICT, "A filter with this name already exists");
    }
    let saved = SavedFilter {
        id: data.id("f"),
        user_id: body.user_id,
        name: body.name,
        filters: body.filters,
        created_at: Some(Utc::now()),
    };
    data.saved_filters.push(saved.clone());
    (StatusCode::CREATED, Json(saved)).into_response()
}

async fn delete_filter(State(backend): State<Shared>, Path(id): Path<String>) -> Response {
    let mut data = backend.data();
    let before = data.saved_filters.len();
    data.saved_filters.retain(|f| f.id != id);
    if data.saved_filters.len() == before {
        return reject(StatusCode::NOT_FOUND, "Filter not found");
    }
    Json(json!({ "message": "Filter deleted" })).into_response()
}

async fn list_sessions(State(backend): State<Shared>) -> Json<Vec<ChatSession>> {
    Json(backend.data().sessions.clone())
}

async fn create_session(State(backend): State<Shared>, Json(body): Json<NewChatSession>) -> Response {
    let mut data = backend.data();
    let session = ChatSession {
        id: data.id("s"),
        user_id: body.user_id,
        user_name: body.user_name,
        user_email: body.user_email,
        status: SessionStatus::Active,
        unread_count: 0,
        last_message_at: None,
    };
    data.sessions.push(session.clone());
    (StatusCode::CREATED, Json(session)).into_response()
}

async fn get_session(State(backend): State<Shared>, Path(id): Path<String>) -> Response {
    match backend.data().sessions.iter().find(|s| s.id == id) {
        Some(session) => Json(session.clone()).into_response(),
        None => reject(StatusCode::NOT_FOUND, "Session not found"),
    }
}

async fn list_messages(State(backend): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Response {
    let Some(session_id) = params.get("sessionId") else {
        return reject(StatusCode::BAD_REQUEST, "sessionId is required");
    };
    let messages: Vec<ChatMessage> = backend
        .data()
        .messages
        .iter()
        .filter(|m| &m.session_id == session_id)
        .cloned()
        .collect();
    Json(messages).into_response()
}

async fn send_message(State(backend): State<Shared>, Json(body): Json<NewChatMessage>) -> Response {
    let message = {
        let mut data = backend.data();
        if data.fail_sends {
            return reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send message");
        }
        let message = ChatMessage {
            id: data.id("m"),
            session_id: body.session_id,
            sender_id: body.sender_id,
            sender_name: body.sender_name,
            sender_role: body.sender_role,
            content: body.content,
            message_type: body.message_type,
            is_read: false,
            created_at: Utc::now(),
        };
        if let Some(session) = data.sessions.iter_mut().find(|s| s.id == message.session_id) {
            session.last_message_at = Some(message.created_at);
        }
        data.messages.push(message.clone());
        message
    };

    backend.publish(
        &session_channel(&message.session_id),
        PushEvent::NewMessage(message.clone()),
    );
    if message.sender_role == SenderRole::Customer {
        for channel in [ADMIN_CHANNEL, ADMINS_CHANNEL] {
            backend.publish(channel, PushEvent::NewCustomerMessage(message.clone()));
        }
    }
    (StatusCode::CREATED, Json(message)).into_response()
}

async fn upload(State(backend): State<Shared>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let Ok(bytes) = field.bytes().await else {
            return reject(StatusCode::BAD_REQUEST, "Unreadable upload");
        };
        let kind = if content_type.starts_with("image/") {
            MessageType::Image
        } else {
            MessageType::File
        };
        backend.data().uploads.push(RecordedUpload {
            file_name: file_name.clone(),
            content_type,
            size: bytes.len(),
        });
        return Json(json!({
            "url": format!("https://cdn.example.com/chat/{file_name}"),
            "type": kind,
        }))
        .into_response();
    }
    reject(StatusCode::BAD_REQUEST, "No file provided")
}

async fn list_orders(State(backend): State<Shared>) -> Json<Vec<Order>> {
    Json(backend.data().orders.clone())
}

async fn create_order(State(backend): State<Shared>, Json(body): Json<NewOrder>) -> Response {
    let mut data = backend.data();
    let order = Order {
        id: data.id("o"),
        user_id: body.user_id,
        items: body.items,
        total: body.total,
        status: Default::default(),
        created_at: Some(Utc::now()),
    };
    data.orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

#[derive(Deserialize)]
struct StatusBody<T> {
    status: T,
}

async fn update_order(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<OrderStatus>>,
) -> Response {
    let mut data = backend.data();
    match data.orders.iter_mut().find(|o| o.id == id) {
        Some(order) => {
            order.status = body.status;
            Json(order.clone()).into_response()
        }
        None => reject(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn list_contacts(State(backend): State<Shared>) -> Json<Vec<ContactMessage>> {
    // newest first, like the admin inbox
    let mut contacts = backend.data().contacts.clone();
    contacts.reverse();
    Json(contacts)
}

async fn submit_contact(State(backend): State<Shared>, Json(body): Json<NewContactMessage>) -> Response {
    if body.name.is_empty() || body.email.is_empty() || body.message.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "Name, email and message are required");
    }
    let mut data = backend.data();
    let contact = ContactMessage {
        id: data.id("c"),
        name: body.name,
        email: body.email,
        subject: body.subject,
        message: body.message,
        status: ContactStatus::New,
        created_at: Some(Utc::now()),
    };
    data.contacts.push(contact.clone());
    (StatusCode::CREATED, Json(contact)).into_response()
}

async fn update_contact(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<ContactStatus>>,
) -> Response {
    let mut data = backend.data();
    match data.contacts.iter_mut().find(|c| c.id == id) {
        Some(contact) => {
            contact.status = body.status;
            Json(contact.clone()).into_response()
        }
        None => reject(StatusCode::NOT_FOUND, "Contact message not found"),
    }
}

async fn delete_contact(State(backend): State<Shared>, Path(id): Path<String>) -> Response {
    let mut data = backend.data();
    let before = data.contacts.len();
    data.contacts.retain(|c| c.id != id);
    if data.contacts.len() == before {
        return reject(StatusCode::NOT_FOUND, "Contact message not found");
    }
    Json(json!({ "message": "Contact message deleted" })).into_response()
}
