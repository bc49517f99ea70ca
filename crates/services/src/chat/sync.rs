use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use domains::{
    AppError, ChatApi, ChatMessage, ChatSession, FileUpload, MessageType, NewChatMessage,
    NewChatSession, Participant, PushChannel, PushEvent, Result, SenderRole, ADMINS_CHANNEL,
    ADMIN_CHANNEL,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::state::{ChatState, PushOutcome};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    /// Full re-fetch cadence while a session is open.
    pub poll_interval: Duration,
    /// Delay before the confirming re-fetch after a send, when there is no
    /// push channel to deliver the echo.
    pub reconcile_delay: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            reconcile_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Default)]
struct Tasks {
    /// Tied to the open session; aborted on switch.
    session: Vec<JoinHandle<()>>,
    /// Admin channel listeners; live until shutdown.
    global: Vec<JoinHandle<()>>,
}

impl Tasks {
    fn abort_session(&mut self) {
        for handle in self.session.drain(..) {
            handle.abort();
        }
    }

    fn abort_all(&mut self) {
        self.abort_session();
        for handle in self.global.drain(..) {
            handle.abort();
        }
    }
}

struct Inner {
    api: Arc<dyn ChatApi>,
    push: Option<Arc<dyn PushChannel>>,
    viewer: Participant,
    config: ChatConfig,
    store: Store<ChatState>,
    tasks: Mutex<Tasks>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            tasks.abort_all();
        }
    }
}

/// Keeps one tab's chat state in sync with the backend.
///
/// Messages arrive from three producers: the bulk fetch on join, push events
/// on `session-{id}`, and a periodic poll. All of them feed the same
/// deduplicating [`super::MessageLog`]. Background tasks hold only a weak
/// reference, so dropping the last handle tears everything down.
#[derive(Clone)]
pub struct ChatSync {
    inner: Arc<Inner>,
}

impl ChatSync {
    pub fn new(
        api: Arc<dyn ChatApi>,
        push: Option<Arc<dyn PushChannel>>,
        viewer: Participant,
        config: ChatConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                push,
                viewer,
                config,
                store: Store::new(ChatState::default()),
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }

    pub fn store(&self) -> &Store<ChatState> {
        &self.inner.store
    }

    pub fn viewer(&self) -> &Participant {
        &self.inner.viewer
    }

    /// Mount. Customers get a session created for them; admins load the
    /// session list and start listening on the admin channels.
    pub async fn start(&self) -> Result<()> {
        match self.inner.viewer.role {
            SenderRole::Customer => self.ensure_session().await.map(|_| ()),
            SenderRole::Admin => {
                if let Some(push) = &self.inner.push {
                    let listeners = [ADMIN_CHANNEL, ADMINS_CHANNEL]
                        .into_iter()
                        .map(|channel| self.spawn_listener(push.subscribe(channel), channel.to_string()))
                        .collect::<Vec<_>>();
                    self.with_tasks(|t| t.global.extend(listeners));
                }
                self.load_sessions().await.map(|_| ())
            }
        }
    }

    /// Creates the customer's session unless one exists or a create is
    /// already in flight. Admins never create sessions.
    pub async fn ensure_session(&self) -> Result<Option<ChatSession>> {
        let viewer = &self.inner.viewer;
        if viewer.role != SenderRole::Customer {
            return Ok(self.inner.store.read(|s| s.session.clone()));
        }
        let claimed = self.inner.store.update(|s| {
            if s.session.is_some() || s.creating_session {
                return false;
            }
            s.creating_session = true;
            true
        });
        if !claimed {
            return Ok(self.inner.store.read(|s| s.session.clone()));
        }

        let request = NewChatSession {
            user_id: viewer.user_id.clone(),
            user_name: viewer.name.clone(),
            user_email: viewer.email.clone(),
        };
        let created = self.inner.api.create_session(request).await;
        self.inner.store.update(|s| s.creating_session = false);

        match created {
            Ok(session) => {
                tracing::info!(session_id = %session.id, user_id = %viewer.user_id, "chat session created");
                self.join_session(session.clone()).await?;
                Ok(Some(session))
            }
            Err(err) => {
                tracing::error!(error = %err, user_id = %viewer.user_id, "failed to create chat session");
                Err(err)
            }
        }
    }

    /// Makes `session` current: resets the log, subscribes to its push
    /// channel, starts polling and loads its messages.
    pub async fn join_session(&self, session: ChatSession) -> Result<()> {
        self.with_tasks(Tasks::abort_session);
        let session_id = session.id.clone();
        let generation = self.inner.store.update(|s| s.begin_session(session));
        tracing::debug!(session_id = %session_id, generation, "joined chat session");

        let mut handles = Vec::with_capacity(2);
        if let Some(push) = &self.inner.push {
            let channel = domains::session_channel(&session_id);
            handles.push(self.spawn_listener(push.subscribe(&channel), channel));
        }
        handles.push(self.spawn_poller());
        self.with_tasks(|t| t.session.extend(handles));

        self.fetch_messages(&session_id, generation).await
    }

    /// Admin selection from the session list.
    pub async fn select_session(&self, session_id: &str) -> Result<()> {
        let listed = self
            .inner
            .store
            .read(|s| s.sessions.iter().find(|x| x.id == session_id).cloned());
        let session = match listed {
            Some(session) => session,
            None => self.inner.api.get_session(session_id).await?,
        };
        self.join_session(session).await
    }

    pub async fn load_sessions(&self) -> Result<Vec<ChatSession>> {
        let sessions = self.inner.api.list_sessions().await.map_err(|err| {
            tracing::error!(error = %err, "failed to load chat sessions");
            err
        })?;
        self.inner.store.update(|s| s.set_sessions(sessions.clone()));
        Ok(sessions)
    }

    /// Re-fetches the open session's messages. No-op without a session.
    pub async fn refresh_messages(&self) -> Result<()> {
        let current = self
            .inner
            .store
            .read(|s| s.session_id().map(|id| (id.to_string(), s.generation)));
        match current {
            Some((session_id, generation)) => self.fetch_messages(&session_id, generation).await,
            None => Ok(()),
        }
    }

    async fn fetch_messages(&self, session_id: &str, generation: u64) -> Result<()> {
        let messages = self.inner.api.list_messages(session_id).await.map_err(|err| {
            tracing::warn!(session_id, error = %err, "failed to fetch chat messages");
            err
        })?;
        let count = messages.len();
        let applied = self.inner.store.update(|s| s.apply_fetch(generation, messages));
        if applied {
            tracing::debug!(session_id, count, "chat messages synced");
        } else {
            tracing::debug!(session_id, generation, "discarded stale chat messages");
        }
        Ok(())
    }

    pub async fn send_text(&self, content: &str) -> Result<ChatMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("message must not be empty".into()));
        }
        let session_id = self.current_session_id()?;
        let outgoing = self.inner.viewer.outgoing(&session_id, content.to_string(), MessageType::Text);
        self.send(outgoing).await
    }

    /// Uploads the file, then sends its URL as the message content.
    pub async fn send_attachment(&self, file: FileUpload) -> Result<ChatMessage> {
        let session_id = self.current_session_id()?;
        let file_name = file.file_name.clone();
        let uploaded = self.inner.api.upload(file).await.map_err(|err| {
            tracing::error!(session_id = %session_id, file_name = %file_name, error = %err, "chat upload failed");
            err
        })?;
        let outgoing = self.inner.viewer.outgoing(&session_id, uploaded.url, uploaded.kind);
        self.send(outgoing).await
    }

    /// Optimistic send: render first, then write; roll back on failure.
    async fn send(&self, outgoing: NewChatMessage) -> Result<ChatMessage> {
        let temp = ChatMessage::optimistic(&outgoing);
        let temp_id = temp.id.clone();
        let generation = self.inner.store.update(|s| {
            s.log.push_optimistic(temp);
            s.generation
        });

        match self.inner.api.send_message(outgoing).await {
            Ok(confirmed) => {
                let server_copy = confirmed.clone();
                self.inner.store.update(|s| {
                    if s.generation == generation {
                        s.log.confirm(&temp_id, server_copy);
                    }
                });
                if self.inner.push.is_none() {
                    self.schedule_reconcile();
                }
                Ok(confirmed)
            }
            Err(err) => {
                self.inner.store.update(|s| s.log.rollback(&temp_id));
                tracing::error!(temp_id = %temp_id, error = %err, "failed to send chat message");
                Err(err)
            }
        }
    }

    pub async fn handle_push(&self, event: PushEvent) {
        let outcome = self
            .inner
            .store
            .update(|s| s.apply_push(&event, &self.inner.viewer));
        tracing::debug!(event = event.name(), session_id = event.session_id(), ?outcome, "push event");

        if outcome == PushOutcome::UnknownSession && self.inner.viewer.role == SenderRole::Admin {
            // a customer opened a session we have not listed yet
            if let Err(err) = self.load_sessions().await {
                tracing::warn!(error = %err, "session list refresh after push failed");
            }
        }
    }

    pub fn set_visibility(&self, visible: bool) {
        self.inner.store.update(|s| s.set_visible(visible));
    }

    /// Unmount: stops polling and all listeners.
    pub fn shutdown(&self) {
        self.with_tasks(Tasks::abort_all);
    }

    fn current_session_id(&self) -> Result<String> {
        self.inner
            .store
            .read(|s| s.session_id().map(str::to_string))
            .ok_or_else(|| AppError::Internal("no active chat session".into()))
    }

    fn with_tasks<R>(&self, f: impl FnOnce(&mut Tasks) -> R) -> R {
        let mut guard = match self.inner.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn schedule_reconcile(&self) {
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.config.reconcile_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sync) = upgrade(&weak) {
                // the poll will retry on failure
                let _ = sync.refresh_messages().await;
            }
        });
        self.with_tasks(|t| {
            t.session.retain(|h| !h.is_finished());
            t.session.push(handle);
        });
    }

    fn spawn_poller(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick fires immediately; the join already fetched
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(sync) = upgrade(&weak) else { break };
                match sync.refresh_messages().await {
                    Ok(()) => {}
                    Err(err) if err.is_transient() => {
                        tracing::warn!(error = %err, "chat poll failed, retrying next interval");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "chat poll failed permanently, stopping");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_listener(&self, mut rx: broadcast::Receiver<PushEvent>, channel: String) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let received = rx.recv().await;
                let Some(sync) = upgrade(&weak) else { break };
                match received {
                    Ok(event) => sync.handle_push(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %channel, skipped, "push listener lagged, resyncing");
                        let _ = sync.refresh_messages().await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!(channel = %channel, "push channel closed");
                        break;
                    }
                }
            }
        })
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<ChatSync> {
    weak.upgrade().map(|inner| ChatSync { inner })
}
