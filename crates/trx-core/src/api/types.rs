//! Wire types for the agent HTTP API.
//!
//! Field names follow the deployed JSON contract exactly. Action parameters
//! and observation results are arbitrary JSON, so they stay as
//! `serde_json::Value` and are only serialized for display.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One query submission. Immutable once issued.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// A reasoning record for one iteration of the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    pub iteration: u32,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub content: ThoughtContent,
}

/// Free-form reasoning fields; every one of them is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThoughtContent {
    pub thought: String,
    pub reasoning: String,
    pub next_action: Value,
    pub expected_outcome: String,
}

/// A function-call record for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub iteration: u32,
    #[serde(default)]
    pub timestamp: String,
    pub action: ActionCall,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionCall {
    pub function_name: String,
    pub parameters: Value,
    pub reason: String,
}

/// A function-result record for one iteration.
///
/// The error variant replaces the function fields with an `error` string,
/// so everything except `iteration` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Observation {
    pub iteration: u32,
    pub timestamp: String,
    pub function: Option<String>,
    pub parameters: Value,
    pub result: Value,
    pub result_summary: String,
    pub error: Option<String>,
}

impl Observation {
    /// Short human-readable summary line, preferring the server-side one.
    pub fn summary(&self) -> String {
        if let Some(error) = &self.error {
            return format!("error: {error}");
        }
        if !self.result_summary.is_empty() {
            return self.result_summary.clone();
        }
        self.result.to_string()
    }
}

/// The authoritative terminal record for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub metadata: ResponseMetadata,
    #[serde(default)]
    pub thoughts: Vec<Thought>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_state: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseMetadata {
    pub session_id: String,
    pub user_id: String,
    pub iterations: u32,
    pub functions_used: u32,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /api/session` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: String,
}

/// `GET /api/session/{id}/history` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    #[serde(default)]
    pub short_term_memory: Value,
    #[serde(default)]
    pub long_term_memory: Value,
    #[serde(default)]
    pub metadata: Value,
}

/// `DELETE /api/session/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAck {
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

/// One entry of `GET /api/functions`.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args_schema: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionList {
    pub functions: Vec<FunctionSpec>,
}

/// `GET /health` response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}
