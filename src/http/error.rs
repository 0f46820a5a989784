//! API error types
//!
//! Failures surfaced by the HTTP client, split by how the caller reacts:
//! transport problems, an invalid session, and errors the server explained.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request exceeded the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Could not connect to the backend
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Any other transport level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend rejected the credentials. The stored token has already been purged.
    #[error("Unauthorized{}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    Unauthorized { detail: Option<String> },

    /// Non-2xx status other than 401
    #[error("API error {status}{}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Unavailable(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Request(err)
        }
    }

    /// Server-supplied explanation, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail } | ApiError::Status { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }

    /// Message suitable for showing to the user: the server's detail when
    /// present, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error body returned by the backend.
///
/// Only a string `detail` counts as a message. Validation failures send a
/// list of field errors under the same key; those are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorResponse {
    pub detail: Option<String>,
}

#[derive(Deserialize)]
struct RawErrorResponse {
    #[serde(default)]
    detail: serde_json::Value,
}

impl ErrorResponse {
    /// Parse an error body, tolerating empty or non-JSON payloads
    pub fn parse(body: &str) -> Self {
        let detail = serde_json::from_str::<RawErrorResponse>(body)
            .ok()
            .and_then(|raw| match raw.detail {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            });
        Self { detail }
    }
}

/// Result type for backend calls
pub type ApiResult<T> = Result<T, ApiError>;
