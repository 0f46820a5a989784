//! Client State Stores
//!
//! Containers holding what the front-end renders. Every action catches its
//! own failures: auth actions return an [`auth::AuthOutcome`], chat actions
//! record the failure in state, and both log through `tracing`.
//!
//! - **auth**: token and current user
//! - **theme**: light/dark preference
//! - **chat**: groups, conversations, messages and the selection cursors

pub mod auth;
pub mod chat;
pub mod theme;

pub use auth::{AuthOutcome, AuthState, AuthStore};
pub use chat::{ChatSnapshot, ChatStore};
pub use theme::{Theme, ThemeStore};
