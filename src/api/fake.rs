//! In-process backend used by store tests.
//!
//! Keeps groups, conversations and messages in memory, records every call,
//! can be told to fail an endpoint, and can hold an endpoint open until the
//! test releases it.

use super::dto::*;
use super::Backend;
use crate::http::{ApiError, ApiResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Default)]
pub(crate) struct FakeState {
    pub groups: Vec<Group>,
    pub conversations: HashMap<GroupId, Vec<Conversation>>,
    pub messages: HashMap<ConversationId, Vec<Message>>,
    pub user: Option<User>,
    pub password: String,
    pub providers: Vec<String>,
    /// Endpoint name -> detail message the failure carries
    pub failing: HashMap<&'static str, Option<String>>,
    pub held: HashSet<&'static str>,
    pub calls: Vec<&'static str>,
    pub asks: Vec<AskRequest>,
    next_id: i64,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub state: Mutex<FakeState>,
    release: Notify,
}

pub(crate) fn group(id: GroupId, name: &str) -> Group {
    Group {
        id,
        name: name.to_string(),
        description: None,
        member_count: 1,
        document_count: 2,
    }
}

pub(crate) fn conversation(id: ConversationId, group_id: GroupId, title: &str) -> Conversation {
    Conversation {
        id,
        title: Some(title.to_string()),
        group_id,
        message_count: 0,
        created_at: "2025-01-01T00:00:00".to_string(),
        updated_at: "2025-01-01T00:00:00".to_string(),
    }
}

pub(crate) fn message(id: MessageId, role: MessageRole, content: &str) -> Message {
    Message {
        id,
        role,
        content: content.to_string(),
        sources: None,
        created_at: "2025-01-01T00:00:00".to_string(),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            state.next_id = 1000;
            state.password = "secret".to_string();
            state.providers = vec!["ollama".to_string(), "gemini".to_string()];
            state.user = Some(User {
                id: 1,
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                full_name: Some("Alice".to_string()),
                role: "user".to_string(),
            });
        }
        backend
    }

    /// Two groups; group 1 has two conversations, conversation 10 has two messages
    pub fn seeded() -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock().unwrap();
            state.groups = vec![group(1, "Engineering"), group(2, "Finance")];
            state.conversations.insert(
                1,
                vec![
                    conversation(10, 1, "Deploy steps"),
                    conversation(11, 1, "On-call"),
                ],
            );
            state.conversations.insert(2, vec![conversation(20, 2, "Budget")]);
            state.messages.insert(
                10,
                vec![
                    message(100, MessageRole::User, "How do we deploy?"),
                    message(101, MessageRole::Assistant, "Run the pipeline."),
                ],
            );
            state.messages.insert(
                20,
                vec![message(200, MessageRole::User, "What is the budget?")],
            );
        }
        backend
    }

    /// Make `endpoint` fail with a 400 carrying `detail`
    pub fn fail(&self, endpoint: &'static str, detail: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(endpoint, detail.map(|d| d.to_string()));
    }

    /// Hold calls to `endpoint` until [`FakeBackend::release`]
    pub fn hold(&self, endpoint: &'static str) {
        self.state.lock().unwrap().held.insert(endpoint);
    }

    /// Let one held call proceed
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == endpoint)
            .count()
    }

    pub fn asks(&self) -> Vec<AskRequest> {
        self.state.lock().unwrap().asks.clone()
    }

    /// Wait until `endpoint` has been called at least `n` times
    pub async fn wait_for_calls(&self, endpoint: &str, n: usize) {
        while self.calls(endpoint) < n {
            tokio::task::yield_now().await;
        }
    }

    async fn enter(&self, endpoint: &'static str) -> ApiResult<()> {
        let held = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(endpoint);
            state.held.contains(endpoint)
        };

        if held {
            self.release.notified().await;
        }

        let failure = self.state.lock().unwrap().failing.get(endpoint).cloned();
        match failure {
            Some(detail) => Err(ApiError::Status {
                status: 400,
                detail,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> ApiResult<TokenResponse> {
        self.enter("login").await?;
        let state = self.state.lock().unwrap();
        let valid = state
            .user
            .as_ref()
            .map(|u| u.username == username && state.password == password)
            .unwrap_or(false);
        if !valid {
            return Err(ApiError::Unauthorized {
                detail: Some("Incorrect username or password".to_string()),
            });
        }
        Ok(TokenResponse {
            access_token: format!("token-{}", username),
            token_type: Some("bearer".to_string()),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<User> {
        self.enter("register").await?;
        Ok(User {
            id: 2,
            username: request.username.clone(),
            email: request.email.clone(),
            full_name: request.full_name.clone(),
            role: "user".to_string(),
        })
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.enter("me").await?;
        self.state
            .lock()
            .unwrap()
            .user
            .clone()
            .ok_or(ApiError::Unauthorized { detail: None })
    }

    async fn logout(&self) -> ApiResult<()> {
        self.enter("logout").await
    }

    async fn list_groups(&self) -> ApiResult<Vec<Group>> {
        self.enter("groups").await?;
        Ok(self.state.lock().unwrap().groups.clone())
    }

    async fn list_conversations(&self, group_id: GroupId) -> ApiResult<Vec<Conversation>> {
        self.enter("conversations").await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .conversations
            .get(&group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn conversation_messages(
        &self,
        conversation_id: ConversationId,
    ) -> ApiResult<Vec<Message>> {
        self.enter("messages").await?;
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&conversation_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                detail: Some("Conversation not found".to_string()),
            })
    }

    async fn ask(&self, request: &AskRequest) -> ApiResult<AskResponse> {
        self.state.lock().unwrap().asks.push(request.clone());
        self.enter("ask").await?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let conversation_id = match request.conversation_id {
            Some(id) => id,
            None => {
                let id = state.next_id;
                state
                    .conversations
                    .entry(request.group_id)
                    .or_default()
                    .insert(0, conversation(id, request.group_id, &request.question));
                id
            }
        };

        state.next_id += 1;
        let user_id = state.next_id;
        state.next_id += 1;
        let answer_id = state.next_id;
        let answer = format!("Answer to: {}", request.question);

        let thread = state.messages.entry(conversation_id).or_default();
        thread.push(message(user_id, MessageRole::User, &request.question));
        thread.push(message(answer_id, MessageRole::Assistant, &answer));
        let count = thread.len() as u32;

        if let Some(list) = state.conversations.get_mut(&request.group_id) {
            if let Some(c) = list.iter_mut().find(|c| c.id == conversation_id) {
                c.message_count = count;
            }
        }

        Ok(AskResponse {
            conversation_id,
            message_id: answer_id,
            answer,
            sources: vec![Source {
                document_id: 1,
                document_name: "handbook.pdf".to_string(),
                content: "Relevant excerpt".to_string(),
                score: 0.91,
                chunk_index: Some(0),
            }],
            model: Some("fake".to_string()),
            confidence: Some(0.8),
            generation_time: Some(0.1),
        })
    }

    async fn update_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> ApiResult<Conversation> {
        self.enter("rename").await?;
        let mut state = self.state.lock().unwrap();
        let renamed = state
            .conversations
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|c| c.id == conversation_id)
            .map(|c| {
                c.title = Some(title.to_string());
                c.clone()
            });
        renamed.ok_or(ApiError::Status {
            status: 404,
            detail: Some("Conversation not found".to_string()),
        })
    }

    async fn delete_conversation(&self, conversation_id: ConversationId) -> ApiResult<()> {
        self.enter("delete").await?;
        let mut state = self.state.lock().unwrap();
        for list in state.conversations.values_mut() {
            list.retain(|c| c.id != conversation_id);
        }
        state.messages.remove(&conversation_id);
        Ok(())
    }

    async fn list_providers(&self) -> ApiResult<ProvidersResponse> {
        self.enter("providers").await?;
        let providers = self.state.lock().unwrap().providers.clone();
        Ok(ProvidersResponse {
            default: providers.first().cloned(),
            providers,
        })
    }
}
