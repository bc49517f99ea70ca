//! # Ports
//!
//! Contracts for everything outside this process: the REST backend and the
//! push-messaging service. Adapters implement these; services only see the
//! traits.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::Result;
use crate::models::{
    ChatMessage, ChatSession, ContactMessage, ContactStatus, Domain, FileUpload, NewChatMessage,
    NewChatSession, NewContactMessage, NewOrder, NewSavedFilter, Order, OrderStatus, PushEvent,
    SavedFilter, UploadedFile,
};

/// Read access to the domain inventory.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DomainCatalog: Send + Sync {
    /// The full listing, fetched once per page load.
    async fn list_domains(&self) -> Result<Vec<Domain>>;
    async fn get_domain(&self, id: &str) -> Result<Domain>;
    /// Distinct TLDs present in the inventory (e.g. `".com"`).
    async fn list_tlds(&self) -> Result<Vec<String>>;
}

/// Persistence of named filter snapshots. Names are unique per user;
/// a duplicate is reported as `AppError::Conflict`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SavedFilterApi: Send + Sync {
    async fn save_filter(&self, filter: NewSavedFilter) -> Result<SavedFilter>;
    async fn list_filters(&self, user_id: &str) -> Result<Vec<SavedFilter>>;
    async fn delete_filter(&self, id: &str) -> Result<()>;
}

/// The chat REST surface.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn create_session(&self, session: NewChatSession) -> Result<ChatSession>;
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;
    async fn get_session(&self, id: &str) -> Result<ChatSession>;
    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;
    async fn send_message(&self, message: NewChatMessage) -> Result<ChatMessage>;
    async fn upload(&self, file: FileUpload) -> Result<UploadedFile>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<Order>;
    async fn list_orders(&self) -> Result<Vec<Order>>;
    async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<Order>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContactApi: Send + Sync {
    async fn submit_contact(&self, message: NewContactMessage) -> Result<ContactMessage>;
    async fn list_contacts(&self) -> Result<Vec<ContactMessage>>;
    async fn update_contact_status(&self, id: &str, status: ContactStatus) -> Result<ContactMessage>;
    async fn delete_contact(&self, id: &str) -> Result<()>;
}

/// A publish/subscribe transport delivering server-originated events.
///
/// A subscriber that falls behind sees `RecvError::Lagged` and is expected to
/// resynchronize over REST.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PushChannel: Send + Sync {
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<PushEvent>;
}

