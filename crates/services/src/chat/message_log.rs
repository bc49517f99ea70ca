use std::collections::HashSet;

use domains::ChatMessage;

/// The message list of the active session plus the set of IDs already shown.
///
/// Every source (bulk fetch, push, poll, optimistic send) goes through this
/// type, so no `_id` ever appears twice. Whoever delivers a message first
/// wins; later deliveries of the same ID are no-ops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    processed: HashSet<String>,
    /// Temp IDs whose send has not completed yet.
    pending: HashSet<String>,
}

impl MessageLog {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drops everything; used when switching sessions.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.processed.clear();
        self.pending.clear();
    }

    /// Merges a server snapshot by `_id`. The snapshot's entries come first,
    /// in server order and in their server form. Messages already shown but
    /// missing from the snapshot (delivered by push after the snapshot was
    /// taken) follow in their previous order, and optimistic messages whose
    /// send is still in flight stay at the tail.
    pub fn seed(&mut self, server: Vec<ChatMessage>) {
        let previous = std::mem::take(&mut self.messages);
        self.processed.clear();
        for message in server {
            self.ingest(message);
        }
        let (in_flight, shown): (Vec<_>, Vec<_>) = previous
            .into_iter()
            .filter(|m| !m.is_temporary() || self.pending.contains(&m.id))
            .partition(|m| self.pending.contains(&m.id));
        for message in shown.into_iter().chain(in_flight) {
            self.ingest(message);
        }
    }

    /// Appends `message` unless its ID was already seen. Returns whether it
    /// was appended.
    pub fn ingest(&mut self, message: ChatMessage) -> bool {
        if !self.processed.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn push_optimistic(&mut self, message: ChatMessage) {
        self.pending.insert(message.id.clone());
        self.ingest(message);
    }

    /// Swaps the temp entry for the server's canonical copy, in place. If the
    /// canonical copy already arrived (push beat the POST response) the temp
    /// entry is simply dropped.
    pub fn confirm(&mut self, temp_id: &str, confirmed: ChatMessage) {
        self.pending.remove(temp_id);
        self.processed.remove(temp_id);
        let slot = self.messages.iter().position(|m| m.id == temp_id);

        if self.processed.contains(&confirmed.id) {
            if let Some(idx) = slot {
                self.messages.remove(idx);
            }
            return;
        }
        self.processed.insert(confirmed.id.clone());
        match slot {
            Some(idx) => self.messages[idx] = confirmed,
            None => self.messages.push(confirmed),
        }
    }

    /// Removes a failed optimistic message. Returns whether it was present.
    pub fn rollback(&mut self, temp_id: &str) -> bool {
        self.pending.remove(temp_id);
        self.processed.remove(temp_id);
        let before = self.messages.len();
        self.messages.retain(|m| m.id != temp_id);
        self.messages.len() != before
    }
}
