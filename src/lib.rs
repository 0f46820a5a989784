//! # DocQA Client
//!
//! Client-side state for the document Q&A service: session handling, the
//! chat workflow over groups and conversations, and presentation
//! preferences, with a terminal front-end on top.
//!
//! ## Modules
//!
//! - [`stores`]: Auth, chat and theme state containers
//! - [`api`]: Typed backend REST surface
//! - [`http`]: HTTP client with token injection and session invalidation
//! - [`router`]: Route table and auth guard
//! - [`storage`]: Durable key-value storage for the token and theme
//! - [`app`]: Wires everything into an [`AppContext`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docqa_client::{AppContext, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = AppContext::from_config(Config::load_default())?;
//!     app.start().await?;
//!
//!     let outcome = app.auth.login("alice", "secret").await;
//!     if !outcome.success {
//!         eprintln!("{}", outcome.message.unwrap_or_default());
//!         return Ok(());
//!     }
//!
//!     app.chat.fetch_groups().await;
//!     app.chat.send_message("What does the onboarding guide cover?").await;
//!
//!     for message in app.chat.messages().await {
//!         println!("{}: {}", message.role, message.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod http;
pub mod logging;
pub mod router;
pub mod storage;
pub mod stores;

pub use api::{
    AskRequest, AskResponse, Backend, Conversation, ConversationId, Group, GroupId, Message,
    MessageId, MessageRole, RegisterRequest, RestBackend, Source, User,
};
pub use app::AppContext;
pub use config::{Config, ConfigError, LoggingConfig};
pub use http::{ApiError, ApiResult, ApiSettings, HttpClient, Navigator};
pub use logging::init_logging;
pub use router::{GuardDecision, ResolvedRoute, Router, RouterError, View};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use stores::{AuthOutcome, AuthStore, ChatSnapshot, ChatStore, Theme, ThemeStore};
