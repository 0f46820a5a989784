//! Backend HTTP client

use super::error::{ApiError, ApiResult, ErrorResponse};
use crate::config::ApiConfig;
use crate::router::LOGIN_PATH;
use crate::storage::{KeyValueStore, TOKEN_KEY};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Full-page navigation hook used when the session is invalidated.
///
/// Implementations must move to `path` without consulting any route guard.
pub trait Navigator: Send + Sync {
    fn hard_redirect(&self, path: &str);
}

/// Connection settings for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL, e.g. "http://localhost:8000"
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for ApiSettings {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            request_timeout_ms: config.timeout_secs * 1000,
        }
    }
}

/// Single configured request object for all backend calls
pub struct HttpClient {
    client: Client,
    settings: ApiSettings,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
}

impl HttpClient {
    pub fn new(
        settings: ApiSettings,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            settings,
            store,
            navigator,
        })
    }

    /// Current configuration
    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Build a request with the bearer token, if one is stored
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut builder = self
            .client
            .request(method.clone(), self.url(path))
            .header("x-request-id", &request_id);

        if let Some(token) = self.store.get(TOKEN_KEY) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        tracing::debug!(request_id = %request_id, method = %method, path, "Sending request");
        builder
    }

    async fn execute(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = ErrorResponse::parse(&body).detail;

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session();
            return Err(ApiError::Unauthorized { detail });
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    /// Drop the stored token and leave for the login page, independent of
    /// whatever the stores currently hold in memory.
    fn invalidate_session(&self) {
        tracing::warn!("Received 401, clearing stored session");
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            tracing::error!(error = %e, "Failed to clear stored token");
        }
        self.navigator.hard_redirect(LOGIN_PATH);
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        Self::decode(response).await
    }

    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .execute(self.request(Method::GET, path).query(query))
            .await?;
        Self::decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.request(Method::POST, path).json(body))
            .await?;
        Self::decode(response).await
    }

    /// POST an `application/x-www-form-urlencoded` body
    pub async fn post_form<B, T>(&self, path: &str, form: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.request(Method::POST, path).form(form))
            .await?;
        Self::decode(response).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.request(Method::PUT, path).json(body))
            .await?;
        Self::decode(response).await
    }

    /// DELETE, ignoring any response body
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}
