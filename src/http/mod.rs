//! HTTP Client
//!
//! Thin layer over `reqwest` shared by every backend call:
//!
//! - bearer token read from storage and attached to each request
//! - a 401 from any endpoint purges the stored token and hard-redirects to
//!   the login route through the [`Navigator`] hook
//! - non-2xx responses become typed [`ApiError`]s carrying the server's
//!   `detail` message when it sent one

mod client;
mod error;

pub use client::{ApiSettings, HttpClient, Navigator};
pub use error::{ApiError, ApiResult, ErrorResponse};
