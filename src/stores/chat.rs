//! Chat Store
//!
//! Single source of truth for groups, conversations and messages, plus the
//! two selection cursors into them. Actions sequence the dependent fetches
//! (group → conversations → messages) and give `send_message` optimistic
//! semantics.
//!
//! # Stale responses
//!
//! Every change of selection bumps an epoch. A response is only applied if
//! the selection it was requested under is still current; otherwise it is
//! logged and dropped. This keeps a slow reply from landing in the list of a
//! group or conversation the user has already left.
//!
//! # Local messages
//!
//! Messages created on the client (the optimistic question and error
//! replies) get negative ids from a monotonic counter, so they never collide
//! with each other or with server ids.

use crate::api::{
    AskRequest, Backend, Conversation, ConversationId, Group, GroupId, Message, MessageRole,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shown when a send fails without a server explanation
pub const SEND_FAILED: &str =
    "Sorry, something went wrong while processing your question. Please try again later.";

/// Everything a chat view renders
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
    pub groups: Vec<Group>,
    pub current_group_id: Option<GroupId>,
    pub conversations: Vec<Conversation>,
    pub current_conversation_id: Option<ConversationId>,
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub is_sending: bool,
    pub providers: Vec<String>,
    /// LLM provider sent with each question; `None` lets the backend choose
    pub provider: Option<String>,
}

impl ChatSnapshot {
    pub fn current_group(&self) -> Option<&Group> {
        let id = self.current_group_id?;
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        let id = self.current_conversation_id?;
        self.conversations.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Default)]
struct ChatState {
    view: ChatSnapshot,
    epoch: u64,
    pending_loads: usize,
    /// Id of the send that owns `view.is_sending`
    sending: Option<u64>,
    next_send: u64,
}

impl ChatState {
    fn clear_conversation(&mut self) {
        self.view.current_conversation_id = None;
        self.view.messages.clear();
        self.epoch += 1;
    }
}

pub struct ChatStore {
    backend: Arc<dyn Backend>,
    state: RwLock<ChatState>,
    local_ids: AtomicI64,
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl ChatStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: RwLock::new(ChatState::default()),
            local_ids: AtomicI64::new(0),
        }
    }

    fn next_local_id(&self) -> i64 {
        -(self.local_ids.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn local_message(&self, role: MessageRole, content: String) -> Message {
        Message {
            id: self.next_local_id(),
            role,
            content,
            sources: None,
            created_at: timestamp(),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> ChatSnapshot {
        self.state.read().await.view.clone()
    }

    pub async fn current_group(&self) -> Option<Group> {
        self.state.read().await.view.current_group().cloned()
    }

    pub async fn current_conversation(&self) -> Option<Conversation> {
        self.state.read().await.view.current_conversation().cloned()
    }

    pub async fn current_group_id(&self) -> Option<GroupId> {
        self.state.read().await.view.current_group_id
    }

    pub async fn current_conversation_id(&self) -> Option<ConversationId> {
        self.state.read().await.view.current_conversation_id
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.view.messages.clone()
    }

    pub async fn is_sending(&self) -> bool {
        self.state.read().await.view.is_sending
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.view.is_loading
    }

    /// Drop all chat state, e.g. after signing out.
    ///
    /// Requests still in flight keep their bookkeeping: a pending send keeps
    /// `is_sending` until it finishes, and pending loads keep `is_loading`.
    /// Their results are discarded.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let mut fresh = ChatState {
            epoch: state.epoch + 1,
            pending_loads: state.pending_loads,
            sending: state.sending,
            next_send: state.next_send,
            ..Default::default()
        };
        fresh.view.is_sending = state.sending.is_some();
        fresh.view.is_loading = state.pending_loads > 0;
        *state = fresh;
    }

    // ============================================
    // Groups
    // ============================================

    /// Load the group list; selects the first group if none is selected yet
    pub async fn fetch_groups(&self) {
        let groups = match self.backend.list_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch groups");
                return;
            }
        };

        let auto_select = {
            let mut state = self.state.write().await;
            state.view.groups = groups;
            tracing::info!(count = state.view.groups.len(), "Groups loaded");

            match state.view.current_group_id {
                None => state.view.groups.first().map(|g| g.id),
                Some(_) => None,
            }
        };

        if let Some(group_id) = auto_select {
            self.select_group(group_id).await;
        }
    }

    /// Switch group. Conversation selection and messages are cleared before
    /// the new group's conversations are requested.
    pub async fn select_group(&self, group_id: GroupId) {
        {
            let mut state = self.state.write().await;
            state.view.current_group_id = Some(group_id);
            state.clear_conversation();
        }
        tracing::info!(group_id, "Group selected");

        self.fetch_conversations().await;
    }

    // ============================================
    // Conversations
    // ============================================

    /// Reload the conversation list of the current group
    pub async fn fetch_conversations(&self) {
        let Some(group_id) = self.current_group_id().await else {
            return;
        };

        match self.backend.list_conversations(group_id).await {
            Ok(conversations) => {
                let mut state = self.state.write().await;
                if state.view.current_group_id != Some(group_id) {
                    tracing::debug!(group_id, "Discarding conversations of a deselected group");
                    return;
                }
                tracing::info!(group_id, count = conversations.len(), "Conversations loaded");
                state.view.conversations = conversations;
            }
            Err(e) => {
                tracing::error!(group_id, error = %e, "Failed to fetch conversations");
            }
        }
    }

    /// Open a conversation and load its messages
    pub async fn select_conversation(&self, conversation_id: ConversationId) {
        {
            let mut state = self.state.write().await;
            state.clear_conversation();
            state.view.current_conversation_id = Some(conversation_id);
        }
        tracing::debug!(conversation_id, "Conversation selected");

        self.fetch_messages().await;
    }

    /// Leave the current conversation; the next question starts a new one
    pub async fn create_new_conversation(&self) {
        self.state.write().await.clear_conversation();
        tracing::info!("New conversation started");
    }

    /// Delete a conversation. On success it disappears from the list at once
    /// and the list is refreshed; on failure nothing changes locally.
    pub async fn delete_conversation(&self, conversation_id: ConversationId) -> bool {
        if let Err(e) = self.backend.delete_conversation(conversation_id).await {
            tracing::error!(conversation_id, error = %e, "Failed to delete conversation");
            return false;
        }

        {
            let mut state = self.state.write().await;
            if state.view.current_conversation_id == Some(conversation_id) {
                state.clear_conversation();
            }
            state.view.conversations.retain(|c| c.id != conversation_id);
        }

        self.fetch_conversations().await;
        tracing::info!(conversation_id, "Conversation deleted");
        true
    }

    /// Rename a conversation, then refresh the list
    pub async fn rename_conversation(&self, conversation_id: ConversationId, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            tracing::warn!(conversation_id, "Refusing to set an empty title");
            return false;
        }

        match self.backend.update_conversation(conversation_id, title).await {
            Ok(updated) => {
                {
                    let mut state = self.state.write().await;
                    if let Some(entry) = state
                        .view
                        .conversations
                        .iter_mut()
                        .find(|c| c.id == conversation_id)
                    {
                        *entry = updated;
                    }
                }
                self.fetch_conversations().await;
                tracing::info!(conversation_id, "Conversation renamed");
                true
            }
            Err(e) => {
                tracing::error!(conversation_id, error = %e, "Failed to rename conversation");
                false
            }
        }
    }

    // ============================================
    // Messages
    // ============================================

    /// Replace the message list with the current conversation's messages
    pub async fn fetch_messages(&self) {
        let (conversation_id, epoch) = {
            let mut state = self.state.write().await;
            let Some(conversation_id) = state.view.current_conversation_id else {
                return;
            };
            state.pending_loads += 1;
            state.view.is_loading = true;
            (conversation_id, state.epoch)
        };

        let result = self.backend.conversation_messages(conversation_id).await;

        let mut state = self.state.write().await;
        match result {
            Ok(messages) if state.epoch == epoch => {
                tracing::info!(conversation_id, count = messages.len(), "Messages loaded");
                state.view.messages = messages;
            }
            Ok(_) => {
                tracing::debug!(
                    conversation_id,
                    "Discarding messages of a deselected conversation"
                );
            }
            Err(e) => {
                tracing::error!(conversation_id, error = %e, "Failed to fetch messages");
            }
        }
        state.pending_loads = state.pending_loads.saturating_sub(1);
        state.view.is_loading = state.pending_loads > 0;
    }

    /// Ask a question in the current group.
    ///
    /// Returns `false` without touching state when no group is selected or
    /// another send is in flight. Otherwise the question is appended
    /// immediately, followed by either the answer or an error reply; the
    /// question is never rolled back.
    pub async fn send_message(&self, question: &str) -> bool {
        let (request, epoch, send_id) = {
            let mut state = self.state.write().await;
            let Some(group_id) = state.view.current_group_id else {
                return false;
            };
            if state.sending.is_some() {
                return false;
            }

            let send_id = state.next_send;
            state.next_send += 1;
            state.sending = Some(send_id);
            state.view.is_sending = true;
            let question_message = self.local_message(MessageRole::User, question.to_string());
            state.view.messages.push(question_message);

            let request = AskRequest {
                question: question.to_string(),
                group_id,
                conversation_id: state.view.current_conversation_id,
                document_ids: None,
                llm_provider: state.view.provider.clone(),
            };
            (request, state.epoch, send_id)
        };

        tracing::info!(
            group_id = request.group_id,
            question = %preview(question, 50),
            "Sending message"
        );

        let success = match self.backend.ask(&request).await {
            Ok(response) => {
                let (applied, same_group) = {
                    let mut state = self.state.write().await;
                    let same_group = state.view.current_group_id == Some(request.group_id);
                    let applied = same_group && state.epoch == epoch;
                    if applied {
                        state.view.current_conversation_id = Some(response.conversation_id);
                        state.view.messages.push(Message {
                            id: response.message_id,
                            role: MessageRole::Assistant,
                            content: response.answer,
                            sources: Some(response.sources),
                            created_at: timestamp(),
                        });
                    }
                    (applied, same_group)
                };

                if applied {
                    tracing::info!(
                        conversation_id = response.conversation_id,
                        "Message sent successfully"
                    );
                } else {
                    tracing::warn!(
                        conversation_id = response.conversation_id,
                        "Selection changed while sending, reply not shown"
                    );
                }

                if same_group {
                    self.fetch_conversations().await;
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send message");
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    let content = e.user_message(SEND_FAILED);
                    let reply = self.local_message(MessageRole::Assistant, content);
                    state.view.messages.push(reply);
                }
                false
            }
        };

        let mut state = self.state.write().await;
        if state.sending == Some(send_id) {
            state.sending = None;
            state.view.is_sending = false;
        }
        success
    }

    // ============================================
    // Providers
    // ============================================

    /// Load the available LLM providers, adopting the backend default if
    /// none has been chosen
    pub async fn fetch_providers(&self) {
        match self.backend.list_providers().await {
            Ok(response) => {
                let mut state = self.state.write().await;
                tracing::debug!(count = response.providers.len(), "Providers loaded");
                state.view.providers = response.providers;
                if state.view.provider.is_none() {
                    state.view.provider = response.default;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch providers");
            }
        }
    }

    pub async fn set_provider(&self, provider: Option<String>) {
        self.state.write().await.view.provider = provider;
    }
}
