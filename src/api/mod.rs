//! Backend REST Surface
//!
//! Typed access to the document Q&A backend. The stores talk to a
//! [`Backend`] so they can be driven by the real HTTP implementation or by
//! an in-process fake.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/auth/login` - Exchange form-encoded credentials for a token
//! - `POST /api/auth/register` - Create an account
//! - `GET /api/auth/me` - Current user profile
//! - `POST /api/auth/logout` - Informational logout
//!
//! ## Groups
//! - `GET /api/groups` - Groups visible to the user
//!
//! ## Chat
//! - `GET /api/chat/conversations?group_id=` - Conversations in a group
//! - `GET /api/chat/conversations/{id}` - Conversation with its messages
//! - `PUT /api/chat/conversations/{id}` - Rename a conversation
//! - `DELETE /api/chat/conversations/{id}` - Delete a conversation
//! - `POST /api/chat/ask` - Ask a question, optionally continuing a conversation
//! - `GET /api/chat/providers` - Available LLM providers

pub mod dto;
mod rest;

#[cfg(test)]
pub(crate) mod fake;

pub use dto::*;
pub use rest::RestBackend;

use crate::http::ApiResult;
use async_trait::async_trait;

/// Operations the client needs from the backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange credentials for an access token
    async fn login(&self, username: &str, password: &str) -> ApiResult<TokenResponse>;

    /// Create a new account
    async fn register(&self, request: &RegisterRequest) -> ApiResult<User>;

    /// Profile of the user owning the stored token
    async fn current_user(&self) -> ApiResult<User>;

    /// Tell the backend the user signed out
    async fn logout(&self) -> ApiResult<()>;

    async fn list_groups(&self) -> ApiResult<Vec<Group>>;

    async fn list_conversations(&self, group_id: GroupId) -> ApiResult<Vec<Conversation>>;

    async fn conversation_messages(&self, conversation_id: ConversationId)
        -> ApiResult<Vec<Message>>;

    /// Ask a question; a `None` conversation id starts a new conversation
    async fn ask(&self, request: &AskRequest) -> ApiResult<AskResponse>;

    async fn update_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> ApiResult<Conversation>;

    async fn delete_conversation(&self, conversation_id: ConversationId) -> ApiResult<()>;

    async fn list_providers(&self) -> ApiResult<ProvidersResponse>;
}
