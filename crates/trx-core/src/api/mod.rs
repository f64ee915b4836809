//! HTTP client for the agent backend.
//!
//! Request/response endpoints plus the SSE query stream. All failures are
//! reported as [`ApiError`] with a coarse kind so callers can distinguish
//! transport problems from agent-level ones.

mod sse;
mod stream;
pub mod types;

pub use sse::StreamEvent;
pub use stream::QueryStream;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use types::{
    DeleteAck, FunctionList, HealthStatus, QueryRequest, QueryResponse, SessionCreated,
    SessionHistory,
};

/// Error category for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// Could not reach the backend at all
    Connect,
    /// Failed to parse a response or stream payload
    Parse,
    /// Agent-level error (stream `error` event)
    Agent,
}

/// Structured API error.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, pulling a cleaner message out of the
    /// body when the backend returned structured JSON.
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut message = format!("HTTP {status}");
        if let Ok(json) = serde_json::from_str::<Value>(body) {
            let detail = json
                .get("detail")
                .or_else(|| json.get("error"))
                .and_then(Value::as_str);
            if let Some(detail) = detail {
                message = format!("HTTP {status}: {detail}");
            }
        }
        Self {
            kind: ApiErrorKind::HttpStatus,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Creates an agent-level error (stream `error` event payload).
    pub fn agent(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Agent, message)
    }

    /// True for per-message decode failures that the stream survives.
    pub fn is_transient(&self) -> bool {
        self.kind == ApiErrorKind::Parse
    }

    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ApiErrorKind::Timeout, format!("request timed out: {err}"))
        } else if err.is_connect() {
            Self::new(ApiErrorKind::Connect, format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::parse(format!("failed to decode response: {err}"))
        } else {
            Self::new(ApiErrorKind::Connect, err.to_string())
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Client for the agent backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client from the resolved configuration.
    ///
    /// # Errors
    /// Returns a `Parse` error if the configured base URL is invalid.
    pub fn new(config: &Config) -> ApiResult<Self> {
        Self::with_base_url(&config.base_url)
    }

    pub fn with_base_url(base_url: &str) -> ApiResult<Self> {
        let url = url::Url::parse(base_url)
            .map_err(|e| ApiError::parse(format!("invalid base url '{base_url}': {e}")))?;
        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/session` - create a server-side session.
    pub async fn create_session(&self, user_id: &str) -> ApiResult<SessionCreated> {
        self.post_json(
            "/api/session",
            &serde_json::json!({ "user_id": user_id }),
        )
        .await
    }

    /// `POST /api/query` - synchronous batch query.
    pub async fn query(&self, request: &QueryRequest) -> ApiResult<QueryResponse> {
        self.post_json("/api/query", request).await
    }

    /// `GET /api/query_stream` - opens the SSE channel for a query.
    ///
    /// At most one channel should be open per logical query slot; the caller
    /// closes the previous handle before opening a new one.
    pub async fn open_stream(&self, request: &QueryRequest) -> ApiResult<QueryStream> {
        let mut params = vec![
            ("query", request.query.clone()),
            ("user_id", request.user_id.clone()),
        ];
        if let Some(session_id) = &request.session_id {
            params.push(("session_id", session_id.clone()));
        }

        let response = self
            .http
            .get(format!("{}/api/query_stream", self.base_url))
            .query(&params)
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http_status(status.as_u16(), &body));
        }

        Ok(QueryStream::new(response.bytes_stream()))
    }

    /// `GET /api/session/{id}/history` - stored conversation memory.
    pub async fn session_history(&self, session_id: &str) -> ApiResult<SessionHistory> {
        self.get_json(&format!("/api/session/{session_id}/history"))
            .await
    }

    /// `DELETE /api/session/{id}` - server-side session deletion.
    pub async fn delete_session(&self, session_id: &str) -> ApiResult<DeleteAck> {
        let response = self
            .http
            .delete(format!("{}/api/session/{session_id}", self.base_url))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        Self::decode(response).await
    }

    /// `GET /api/functions` - the tool inventory the agent can call.
    pub async fn functions(&self) -> ApiResult<FunctionList> {
        self.get_json("/api/functions").await
    }

    /// `GET /health` - liveness probe (mounted at the server root).
    pub async fn health(&self) -> ApiResult<HealthStatus> {
        self.get_json("/health").await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        Self::decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http_status(status.as_u16(), &body));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        serde_json::from_str(&body).map_err(|e| ApiError::parse(format!("invalid response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_extracts_fastapi_detail() {
        let err = ApiError::http_status(500, r#"{"detail":"agent exploded"}"#);
        assert_eq!(err.kind, ApiErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 500: agent exploded");
        assert!(err.details.is_some());
    }

    #[test]
    fn http_status_without_body_keeps_plain_message() {
        let err = ApiError::http_status(404, "");
        assert_eq!(err.message, "HTTP 404");
        assert!(err.details.is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::with_base_url("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn invalid_base_url_is_a_parse_error() {
        let err = ApiClient::with_base_url("not a url").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[test]
    fn only_parse_errors_are_transient() {
        assert!(ApiError::parse("x").is_transient());
        assert!(!ApiError::agent("x").is_transient());
        assert!(!ApiError::http_status(500, "").is_transient());
    }
}
