use std::collections::{HashSet, VecDeque};

use domains::{ChatMessage, ChatSession, Participant, PushEvent, SessionStatus};

use super::message_log::MessageLog;

/// Everything a chat view renders. Mutated only through [`super::ChatSync`].
#[derive(Debug, Clone)]
pub struct ChatState {
    /// The customer's session, or the admin's selected one.
    pub session: Option<ChatSession>,
    /// Admin only: every session known to the backend.
    pub sessions: Vec<ChatSession>,
    pub log: MessageLog,
    pub unread: u32,
    pub visible: bool,
    /// Set while a session create request is in flight.
    pub creating_session: bool,
    /// Bumped on every session switch; responses tagged with an older
    /// generation are discarded.
    pub generation: u64,
    counted_elsewhere: RecentIds,
}

/// Ids already counted for other sessions. Admin tabs stay mounted
/// indefinitely, so only the most recent ids are kept; the duplicate delivery
/// on the second admin channel arrives right after the first.
#[derive(Debug, Clone, Default)]
struct RecentIds {
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RecentIds {
    const CAPACITY: usize = 512;

    /// False when `id` was already recorded.
    fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() == Self::CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }

    fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            session: None,
            sessions: Vec::new(),
            log: MessageLog::default(),
            unread: 0,
            visible: true,
            creating_session: false,
            generation: 0,
            counted_elsewhere: RecentIds::default(),
        }
    }
}

/// What a push event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// A new message for the open session was appended.
    Appended { counted: bool },
    /// The open session already had this message.
    Duplicate,
    /// A message for another session the viewer knows about.
    Elsewhere { counted: bool },
    /// A message for a session missing from the admin list.
    UnknownSession,
    StatusChanged,
}

impl ChatState {
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.log.messages()
    }

    /// Makes `session` current and starts a new generation.
    pub fn begin_session(&mut self, session: ChatSession) -> u64 {
        self.generation += 1;
        self.log.reset();
        self.counted_elsewhere.clear();
        self.session = Some(session);
        self.generation
    }

    /// Applies a full message list fetched under `generation`.
    /// Returns false when the response is stale and was dropped.
    pub fn apply_fetch(&mut self, generation: u64, messages: Vec<ChatMessage>) -> bool {
        if generation != self.generation || self.session.is_none() {
            return false;
        }
        self.log.seed(messages);
        true
    }

    pub fn set_sessions(&mut self, sessions: Vec<ChatSession>) {
        if let Some(current) = self.session.as_mut() {
            if let Some(fresh) = sessions.iter().find(|s| s.id == current.id) {
                *current = fresh.clone();
            }
        }
        self.sessions = sessions;
    }

    /// Tab visibility. Becoming visible clears the unread counter for every
    /// session, not just the open one.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.unread = 0;
        }
    }

    pub fn apply_push(&mut self, event: &PushEvent, viewer: &Participant) -> PushOutcome {
        match event {
            PushEvent::NewMessage(message) | PushEvent::NewCustomerMessage(message) => {
                if self.session_id() == Some(message.session_id.as_str()) {
                    self.apply_current(message, viewer)
                } else {
                    self.apply_elsewhere(message, viewer)
                }
            }
            PushEvent::SessionStatusUpdated { session_id, status } => {
                self.set_status(session_id, *status);
                PushOutcome::StatusChanged
            }
        }
    }

    fn apply_current(&mut self, message: &ChatMessage, viewer: &Participant) -> PushOutcome {
        if !self.log.ingest(message.clone()) {
            return PushOutcome::Duplicate;
        }
        if let Some(current) = self.session.as_mut() {
            current.last_message_at = Some(message.created_at);
        }
        let counted = !self.visible && message.sender_id != viewer.user_id;
        if counted {
            self.unread += 1;
        }
        PushOutcome::Appended { counted }
    }

    fn apply_elsewhere(&mut self, message: &ChatMessage, viewer: &Participant) -> PushOutcome {
        // the same message may arrive on more than one admin channel
        if !self.counted_elsewhere.insert(&message.id) {
            return PushOutcome::Elsewhere { counted: false };
        }
        let counted = message.sender_role == viewer.role.counterpart();
        if counted {
            self.unread += 1;
        }
        match self.sessions.iter_mut().find(|s| s.id == message.session_id) {
            Some(session) => {
                if counted {
                    session.unread_count += 1;
                }
                session.last_message_at = Some(message.created_at);
                PushOutcome::Elsewhere { counted }
            }
            None => PushOutcome::UnknownSession,
        }
    }

    fn set_status(&mut self, session_id: &str, status: SessionStatus) {
        let listed = self.sessions.iter_mut().filter(|s| s.id == session_id);
        let current = self.session.iter_mut().filter(|s| s.id == session_id);
        for session in listed.chain(current) {
            session.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MessageType, SenderRole};

    fn participant(id: &str, role: SenderRole) -> Participant {
        Participant {
            user_id: id.into(),
            name: id.into(),
            email: format!("{id}@example.com"),
            role,
        }
    }

    fn session(id: &str) -> ChatSession {
        ChatSession {
            id: id.into(),
            user_id: "cust".into(),
            user_name: "Customer".into(),
            user_email: "cust@example.com".into(),
            status: SessionStatus::Active,
            unread_count: 0,
            last_message_at: None,
        }
    }

    fn message(id: &str, session_id: &str, sender: &str, role: SenderRole) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            session_id: session_id.into(),
            sender_id: sender.into(),
            sender_name: sender.into(),
            sender_role: role,
            content: "hi".into(),
            message_type: MessageType::Text,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut state = ChatState::default();
        let first = state.begin_session(session("s1"));
        let second = state.begin_session(session("s2"));
        assert!(!state.apply_fetch(first, vec![message("m1", "s1", "cust", SenderRole::Customer)]));
        assert!(state.messages().is_empty());
        assert!(state.apply_fetch(second, vec![message("m2", "s2", "cust", SenderRole::Customer)]));
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn unread_for_open_session_only_when_hidden_and_from_someone_else() {
        let viewer = participant("cust", SenderRole::Customer);
        let mut state = ChatState::default();
        state.begin_session(session("s1"));

        let from_admin = PushEvent::NewMessage(message("m1", "s1", "admin", SenderRole::Admin));
        assert_eq!(state.apply_push(&from_admin, &viewer), PushOutcome::Appended { counted: false });

        state.set_visible(false);
        let own = PushEvent::NewMessage(message("m2", "s1", "cust", SenderRole::Customer));
        assert_eq!(state.apply_push(&own, &viewer), PushOutcome::Appended { counted: false });
        let from_admin = PushEvent::NewMessage(message("m3", "s1", "admin", SenderRole::Admin));
        assert_eq!(state.apply_push(&from_admin, &viewer), PushOutcome::Appended { counted: true });
        assert_eq!(state.apply_push(&from_admin, &viewer), PushOutcome::Duplicate);
        assert_eq!(state.unread, 1);

        state.set_visible(true);
        assert_eq!(state.unread, 0);
    }

    #[test]
    fn admin_counts_customer_messages_in_other_sessions() {
        let viewer = participant("admin", SenderRole::Admin);
        let mut state = ChatState::default();
        state.set_sessions(vec![session("s1"), session("s2")]);
        state.begin_session(session("s1"));

        let elsewhere = PushEvent::NewCustomerMessage(message("m1", "s2", "cust", SenderRole::Customer));
        assert_eq!(state.apply_push(&elsewhere, &viewer), PushOutcome::Elsewhere { counted: true });
        // delivered again on the second admin channel
        assert_eq!(state.apply_push(&elsewhere, &viewer), PushOutcome::Elsewhere { counted: false });
        assert_eq!(state.unread, 1);
        assert_eq!(state.sessions[1].unread_count, 1);

        let from_admin = PushEvent::NewMessage(message("m2", "s2", "admin2", SenderRole::Admin));
        assert_eq!(state.apply_push(&from_admin, &viewer), PushOutcome::Elsewhere { counted: false });

        let unknown = PushEvent::NewCustomerMessage(message("m3", "s9", "cust", SenderRole::Customer));
        assert_eq!(state.apply_push(&unknown, &viewer), PushOutcome::UnknownSession);
        assert_eq!(state.unread, 2);
    }

    #[test]
    fn status_updates_reach_list_and_current() {
        let viewer = participant("admin", SenderRole::Admin);
        let mut state = ChatState::default();
        state.set_sessions(vec![session("s1")]);
        state.begin_session(session("s1"));
        let event = PushEvent::SessionStatusUpdated {
            session_id: "s1".into(),
            status: SessionStatus::Closed,
        };
        assert_eq!(state.apply_push(&event, &viewer), PushOutcome::StatusChanged);
        assert_eq!(state.sessions[0].status, SessionStatus::Closed);
        assert_eq!(state.session.as_ref().map(|s| s.status), Some(SessionStatus::Closed));
    }

    #[test]
    fn counted_elsewhere_keeps_only_recent_ids() {
        let viewer = participant("admin", SenderRole::Admin);
        let mut state = ChatState::default();
        state.set_sessions(vec![session("s2")]);

        let total = RecentIds::CAPACITY + 10;
        for i in 0..total {
            let event = PushEvent::NewCustomerMessage(message(&format!("m{i}"), "s2", "cust", SenderRole::Customer));
            assert_eq!(state.apply_push(&event, &viewer), PushOutcome::Elsewhere { counted: true });
        }
        assert_eq!(state.counted_elsewhere.order.len(), RecentIds::CAPACITY);
        assert_eq!(state.unread as usize, total);

        let latest = PushEvent::NewCustomerMessage(message(&format!("m{}", total - 1), "s2", "cust", SenderRole::Customer));
        assert_eq!(state.apply_push(&latest, &viewer), PushOutcome::Elsewhere { counted: false });
        assert_eq!(state.counted_elsewhere.order.len(), RecentIds::CAPACITY);
    }
}
