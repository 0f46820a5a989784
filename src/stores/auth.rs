//! Auth Store
//!
//! Holds the session token and the signed-in user. The token is mirrored
//! to durable storage so the HTTP client and the router see the same
//! session as this store.

use crate::api::{Backend, RegisterRequest, User};
use crate::storage::{KeyValueStore, TOKEN_KEY};
use std::sync::Arc;
use tokio::sync::RwLock;

const LOGIN_FAILED: &str = "Login failed";
const REGISTER_FAILED: &str = "Registration failed";

/// Result of a login or registration attempt, rendered inline by callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl AuthOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
        }
    }
}

/// Current auth state
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_loading: bool,
}

pub struct AuthStore {
    backend: Arc<dyn Backend>,
    store: Arc<dyn KeyValueStore>,
    state: RwLock<AuthState>,
}

impl AuthStore {
    /// Create the store, picking up any token persisted by a previous session
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn KeyValueStore>) -> Self {
        let token = store.get(TOKEN_KEY);
        Self {
            backend,
            store,
            state: RwLock::new(AuthState {
                token,
                ..Default::default()
            }),
        }
    }

    /// Resume a persisted session by loading its profile
    pub async fn resume(&self) {
        if self.is_logged_in().await {
            tracing::debug!("Resuming stored session");
            self.fetch_user().await;
        }
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    async fn set_loading(&self, loading: bool) {
        self.state.write().await.is_loading = loading;
    }

    /// Exchange credentials for a token, persist it, then load the profile
    pub async fn login(&self, username: &str, password: &str) -> AuthOutcome {
        self.set_loading(true).await;

        let outcome = match self.backend.login(username, password).await {
            Ok(response) => match self.store.set(TOKEN_KEY, &response.access_token) {
                Ok(()) => {
                    self.state.write().await.token = Some(response.access_token);
                    tracing::info!(username, "Login successful");
                    self.fetch_user().await;
                    AuthOutcome::ok()
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist token");
                    AuthOutcome::failed(LOGIN_FAILED.to_string())
                }
            },
            Err(e) => {
                tracing::error!(username, error = %e, "Login failed");
                AuthOutcome::failed(e.user_message(LOGIN_FAILED))
            }
        };

        self.set_loading(false).await;
        outcome
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, request: &RegisterRequest) -> AuthOutcome {
        self.set_loading(true).await;

        let outcome = match self.backend.register(request).await {
            Ok(user) => {
                tracing::info!(username = %user.username, "Registration successful");
                AuthOutcome::ok()
            }
            Err(e) => {
                tracing::error!(username = %request.username, error = %e, "Registration failed");
                AuthOutcome::failed(e.user_message(REGISTER_FAILED))
            }
        };

        self.set_loading(false).await;
        outcome
    }

    /// Load the profile for the current token.
    ///
    /// A token that cannot fetch its own profile is treated as invalid and
    /// the session is dropped.
    pub async fn fetch_user(&self) {
        if !self.is_logged_in().await {
            return;
        }

        match self.backend.current_user().await {
            Ok(user) => {
                tracing::info!(username = %user.username, "User fetched");
                self.state.write().await.user = Some(user);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch user");
                self.logout().await;
            }
        }
    }

    /// Forget the session locally
    pub async fn logout(&self) {
        {
            let mut state = self.state.write().await;
            state.token = None;
            state.user = None;
        }
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            tracing::error!(error = %e, "Failed to clear stored token");
        }
    }

    /// Tell the backend, then forget the session regardless of its answer
    pub async fn sign_out(&self) {
        if self.is_logged_in().await {
            if let Err(e) = self.backend.logout().await {
                tracing::debug!(error = %e, "Backend logout failed");
            }
        }
        self.logout().await;
    }
}
