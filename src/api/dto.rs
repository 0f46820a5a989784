//! Data Transfer Objects
//!
//! Request and response types exchanged with the document Q&A backend.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type GroupId = i64;
pub type ConversationId = i64;
pub type MessageId = i64;
pub type DocumentId = i64;

// ============================================
// AUTH DTOs
// ============================================

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: String,
}

impl User {
    /// Display name, falling back to the username
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Form body for `POST /api/auth/login`
#[derive(Debug, Serialize)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response of `POST /api/auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body for `POST /api/auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl RegisterRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            full_name: None,
        }
    }

    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }
}

// ============================================
// GROUP DTOs
// ============================================

/// Knowledge-base group, the scope of every conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub document_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct GroupListResponse {
    #[serde(default)]
    pub groups: Vec<Group>,
}

// ============================================
// CONVERSATION DTOs
// ============================================

/// Conversation summary within a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Null until the backend titles the conversation
    #[serde(default)]
    pub title: Option<String>,
    pub group_id: GroupId,
    #[serde(default)]
    pub message_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled conversation")
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationListResponse {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

/// Conversation detail including its messages
#[derive(Debug, Deserialize)]
pub struct ConversationDetailResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Body for `PUT /api/chat/conversations/{id}`
#[derive(Debug, Serialize)]
pub struct ConversationUpdate<'a> {
    pub title: &'a str,
}

// ============================================
// MESSAGE DTOs
// ============================================

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Retrieved document excerpt cited by an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub document_id: DocumentId,
    pub document_name: String,
    /// Excerpt text
    pub content: String,
    /// Relevance score (higher is more relevant)
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
}

/// Single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server id, or a negative id for messages that only exist locally
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    pub created_at: String,
}

impl Message {
    /// Whether this message was created on the client and never stored server-side
    pub fn is_local(&self) -> bool {
        self.id < 0
    }
}

// ============================================
// ASK DTOs
// ============================================

/// Body for `POST /api/chat/ask`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub group_id: GroupId,
    /// None starts a new conversation
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<DocumentId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
}

/// Response of `POST /api/chat/ask`
#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Seconds spent generating the answer
    #[serde(default)]
    pub generation_time: Option<f64>,
}

/// Response of `GET /api/chat/providers`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
}
