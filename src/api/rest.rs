//! HTTP implementation of [`Backend`]

use super::dto::*;
use super::Backend;
use crate::http::{ApiResult, HttpClient};
use async_trait::async_trait;
use std::sync::Arc;

/// Backend reached over the shared [`HttpClient`]
pub struct RestBackend {
    http: Arc<HttpClient>,
}

impl RestBackend {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

fn conversation_path(id: ConversationId) -> String {
    format!("/api/chat/conversations/{}", id)
}

#[async_trait]
impl Backend for RestBackend {
    async fn login(&self, username: &str, password: &str) -> ApiResult<TokenResponse> {
        self.http
            .post_form("/api/auth/login", &LoginForm { username, password })
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<User> {
        self.http.post_json("/api/auth/register", request).await
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.http.get_json("/api/auth/me").await
    }

    async fn logout(&self) -> ApiResult<()> {
        let _: serde_json::Value = self
            .http
            .post_json("/api/auth/logout", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn list_groups(&self) -> ApiResult<Vec<Group>> {
        let response: GroupListResponse = self.http.get_json("/api/groups").await?;
        Ok(response.groups)
    }

    async fn list_conversations(&self, group_id: GroupId) -> ApiResult<Vec<Conversation>> {
        let response: ConversationListResponse = self
            .http
            .get_json_with_query("/api/chat/conversations", &[("group_id", group_id)])
            .await?;
        Ok(response.conversations)
    }

    async fn conversation_messages(
        &self,
        conversation_id: ConversationId,
    ) -> ApiResult<Vec<Message>> {
        let response: ConversationDetailResponse = self
            .http
            .get_json(&conversation_path(conversation_id))
            .await?;
        Ok(response.messages)
    }

    async fn ask(&self, request: &AskRequest) -> ApiResult<AskResponse> {
        self.http.post_json("/api/chat/ask", request).await
    }

    async fn update_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> ApiResult<Conversation> {
        self.http
            .put_json(
                &conversation_path(conversation_id),
                &ConversationUpdate { title },
            )
            .await
    }

    async fn delete_conversation(&self, conversation_id: ConversationId) -> ApiResult<()> {
        self.http.delete(&conversation_path(conversation_id)).await
    }

    async fn list_providers(&self) -> ApiResult<ProvidersResponse> {
        self.http.get_json("/api/chat/providers").await
    }
}
