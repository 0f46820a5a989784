//! Application Context
//!
//! Owns the stores and their collaborators. Front-ends receive an
//! `AppContext` (or the `Arc`s inside it) instead of reaching for globals.

use crate::api::{Backend, RestBackend};
use crate::config::Config;
use crate::http::{ApiResult, ApiSettings, HttpClient};
use crate::router::{ResolvedRoute, Router, RouterError, HOME_PATH};
use crate::storage::{FileStore, KeyValueStore, StorageResult};
use crate::stores::{AuthStore, ChatStore, ThemeStore};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Shared state for one running client
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub storage: Arc<dyn KeyValueStore>,
    pub router: Arc<Router>,
    pub backend: Arc<dyn Backend>,
    pub auth: Arc<AuthStore>,
    pub chat: Arc<ChatStore>,
    pub theme: Arc<ThemeStore>,
    reloads: Arc<Mutex<watch::Receiver<u64>>>,
}

impl AppContext {
    /// Wire the real HTTP backend over `storage`
    pub fn new(config: Config, storage: Arc<dyn KeyValueStore>) -> ApiResult<Self> {
        let router = Arc::new(Router::new(storage.clone()));
        let http = HttpClient::new(
            ApiSettings::from(&config.api),
            storage.clone(),
            router.clone(),
        )?;
        let backend: Arc<dyn Backend> = Arc::new(RestBackend::new(Arc::new(http)));
        Ok(Self::with_backend(config, storage, router, backend))
    }

    /// Open the configured state file and wire the real backend
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(open_storage(&config)?);
        Ok(Self::new(config, storage)?)
    }

    /// Wire the stores over an arbitrary backend
    pub fn with_backend(
        config: Config,
        storage: Arc<dyn KeyValueStore>,
        router: Arc<Router>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let auth = Arc::new(AuthStore::new(backend.clone(), storage.clone()));
        let chat = Arc::new(ChatStore::new(backend.clone()));
        let theme = Arc::new(ThemeStore::new(storage.clone(), config.ui.prefers_dark));
        let reloads = Arc::new(Mutex::new(router.subscribe_reloads()));

        Self {
            config: Arc::new(config),
            storage,
            router,
            backend,
            auth,
            chat,
            theme,
            reloads,
        }
    }

    /// Resume any stored session and route to the start page
    pub async fn start(&self) -> Result<ResolvedRoute, RouterError> {
        tracing::debug!(
            base_url = %self.config.api.base_url,
            theme = %self.theme.theme(),
            "Starting client"
        );
        self.auth.resume().await;
        self.router.navigate(HOME_PATH)
    }

    /// Sign out and drop all in-memory chat state
    pub async fn sign_out(&self) {
        self.auth.sign_out().await;
        self.chat.reset().await;
        if let Err(e) = self.router.navigate(HOME_PATH) {
            tracing::warn!(error = %e, "Navigation after sign-out failed");
        }
    }

    /// Apply a pending hard redirect: forget the session and drop all chat
    /// state, as a full page load would. Front-ends call this after each
    /// action; returns `true` when the session was torn down.
    pub async fn reload_after_redirect(&self) -> bool {
        {
            let mut reloads = self.reloads.lock().await;
            if !reloads.has_changed().unwrap_or(false) {
                return false;
            }
            reloads.borrow_and_update();
        }

        tracing::info!("Session invalidated, resetting client state");
        self.auth.logout().await;
        self.chat.reset().await;
        true
    }

    pub async fn shutdown(&self) {
        self.chat.reset().await;
        tracing::debug!("Client shut down");
    }
}

fn open_storage(config: &Config) -> StorageResult<FileStore> {
    FileStore::open(&config.storage.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::router::{View, LOGIN_PATH};
    use crate::storage::{MemoryStore, TOKEN_KEY};

    fn context(backend: Arc<FakeBackend>, token: Option<&str>) -> AppContext {
        let storage: Arc<dyn KeyValueStore> = Arc::new(match token {
            Some(t) => MemoryStore::with_entries([(TOKEN_KEY, t)]),
            None => MemoryStore::new(),
        });
        let router = Arc::new(Router::new(storage.clone()));
        AppContext::with_backend(Config::default(), storage, router, backend)
    }

    #[tokio::test]
    async fn test_start_without_session() {
        let backend = Arc::new(FakeBackend::seeded());
        let app = context(backend.clone(), None);

        let route = app.start().await.unwrap();
        assert_eq!(route.path, LOGIN_PATH);
        assert_eq!(backend.calls("me"), 0);
    }

    #[tokio::test]
    async fn test_start_resumes_session() {
        let backend = Arc::new(FakeBackend::seeded());
        let app = context(backend.clone(), Some("persisted"));

        let route = app.start().await.unwrap();
        assert_eq!(route.view(), Some(View::Chat));
        assert!(app.auth.user().await.is_some());
    }

    #[tokio::test]
    async fn test_start_with_rejected_token() {
        let backend = Arc::new(FakeBackend::seeded());
        backend.fail("me", None);
        let app = context(backend, Some("revoked"));

        let route = app.start().await.unwrap();
        assert_eq!(route.path, LOGIN_PATH);
        assert_eq!(app.storage.get(TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_login_then_chat_then_sign_out() {
        let backend = Arc::new(FakeBackend::seeded());
        let app = context(backend, None);
        app.start().await.unwrap();

        assert!(app.auth.login("alice", "secret").await.success);
        assert_eq!(app.router.navigate(LOGIN_PATH).unwrap().path, HOME_PATH);

        app.chat.fetch_groups().await;
        assert!(app.chat.send_message("hello").await);

        app.sign_out().await;
        assert!(!app.auth.is_logged_in().await);
        assert!(app.chat.snapshot().await.groups.is_empty());
        assert_eq!(app.router.current().unwrap().path, LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_nothing_to_reload_without_redirect() {
        let backend = Arc::new(FakeBackend::seeded());
        let app = context(backend, Some("persisted"));
        app.start().await.unwrap();
        app.chat.fetch_groups().await;

        assert!(!app.reload_after_redirect().await);
        assert!(app.auth.is_logged_in().await);
        assert_eq!(app.chat.snapshot().await.groups.len(), 2);
    }

    async fn expired_session_server() -> String {
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::Json;
        use serde_json::json;

        let app = axum::Router::new()
            .route(
                "/api/auth/me",
                get(|| async {
                    Json(json!({
                        "id": 1,
                        "username": "alice",
                        "email": "alice@example.com",
                        "role": "user"
                    }))
                }),
            )
            .route(
                "/api/groups",
                get(|| async { Json(json!({ "groups": [{ "id": 1, "name": "Engineering" }] })) }),
            )
            .route(
                "/api/chat/conversations",
                get(|| async {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "detail": "Token has expired" })),
                    )
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unauthorized_response_tears_down_session() {
        let mut config = Config::default();
        config.api.base_url = expired_session_server().await;
        let storage: Arc<dyn KeyValueStore> =
            Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "expiring")]));
        let app = AppContext::new(config, storage).unwrap();

        assert_eq!(app.start().await.unwrap().view(), Some(View::Chat));
        assert!(app.auth.user().await.is_some());

        // Groups load, then the conversation list comes back 401
        app.chat.fetch_groups().await;
        assert_eq!(app.storage.get(TOKEN_KEY), None);
        assert_eq!(app.router.current().unwrap().path, LOGIN_PATH);
        assert_eq!(app.chat.snapshot().await.groups.len(), 1);

        assert!(app.reload_after_redirect().await);
        assert!(!app.auth.is_logged_in().await);
        assert_eq!(app.auth.user().await, None);
        let snap = app.chat.snapshot().await;
        assert!(snap.groups.is_empty());
        assert_eq!(snap.current_group_id, None);

        assert!(!app.reload_after_redirect().await);
    }
}
