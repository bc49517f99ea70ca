use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of client-generated message IDs awaiting server confirmation.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Push channel every admin tab listens on.
pub const ADMIN_CHANNEL: &str = "admin-channel";
/// Secondary admin broadcast channel.
pub const ADMINS_CHANNEL: &str = "admins";

/// Push channel carrying the messages of one session.
pub fn session_channel(session_id: &str) -> String {
    format!("session-{session_id}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Waiting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Admin,
    Customer,
}

impl SenderRole {
    /// The role on the other side of a conversation.
    pub fn counterpart(&self) -> SenderRole {
        match self {
            SenderRole::Admin => SenderRole::Customer,
            SenderRole::Customer => SenderRole::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
}

/// A support conversation between one customer and the admin team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatSession {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub session_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    pub sender_role: SenderRole,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Builds the locally rendered copy of an outgoing message.
    pub fn optimistic(outgoing: &NewChatMessage) -> Self {
        Self {
            id: format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4()),
            session_id: outgoing.session_id.clone(),
            sender_id: outgoing.sender_id.clone(),
            sender_name: outgoing.sender_name.clone(),
            sender_role: outgoing.sender_role,
            content: outgoing.content.clone(),
            message_type: outgoing.message_type,
            is_read: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub session_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: SenderRole,
    pub content: String,
    pub message_type: MessageType,
}

/// Who is looking at the chat in this tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: SenderRole,
}

impl Participant {
    pub fn outgoing(&self, session_id: &str, content: String, message_type: MessageType) -> NewChatMessage {
        NewChatMessage {
            session_id: session_id.to_string(),
            sender_id: self.user_id.clone(),
            sender_name: self.name.clone(),
            sender_role: self.role,
            content,
            message_type,
        }
    }
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Bytes,
}

/// The upload endpoint's answer: where the file lives and its coarse type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

/// Events delivered over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    NewMessage(ChatMessage),
    NewCustomerMessage(ChatMessage),
    SessionStatusUpdated {
        #[serde(rename = "sessionId")]
        session_id: String,
        status: SessionStatus,
    },
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::NewMessage(_) => "new_message",
            PushEvent::NewCustomerMessage(_) => "new_customer_message",
            PushEvent::SessionStatusUpdated { .. } => "session_status_updated",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            PushEvent::NewMessage(m) | PushEvent::NewCustomerMessage(m) => &m.session_id,
            PushEvent::SessionStatusUpdated { session_id, .. } => session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Participant {
        Participant {
            user_id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: SenderRole::Customer,
        }
    }

    #[test]
    fn optimistic_message_gets_temp_id_and_is_read() {
        let outgoing = customer().outgoing("s1", "hello".into(), MessageType::Text);
        let msg = ChatMessage::optimistic(&outgoing);
        assert!(msg.is_temporary());
        assert!(msg.is_read);
        assert_eq!(msg.session_id, "s1");
        assert_ne!(ChatMessage::optimistic(&outgoing).id, msg.id);
    }

    #[test]
    fn push_event_wire_shape() {
        let event = PushEvent::SessionStatusUpdated {
            session_id: "s9".into(),
            status: SessionStatus::Closed,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "session_status_updated");
        assert_eq!(json["data"]["sessionId"], "s9");
        assert_eq!(event.name(), "session_status_updated");
        assert_eq!(serde_json::from_value::<PushEvent>(json).unwrap(), event);
    }

    #[test]
    fn roles_are_counterparts() {
        assert_eq!(SenderRole::Admin.counterpart(), SenderRole::Customer);
        assert_eq!(SenderRole::Customer.counterpart(), SenderRole::Admin);
        assert_eq!(session_channel("abc"), "session-abc");
    }
}
