//! Session context: owns the single active session identifier.
//!
//! The slot is guarded by an async mutex so that a second `ensure` issued
//! while creation is still in flight waits for it instead of racing past and
//! creating a duplicate session.

use std::future::Future;

use tokio::sync::Mutex;

use crate::api::ApiResult;

/// Holds at most one active session id for one user context.
#[derive(Debug)]
pub struct SessionContext {
    user_id: String,
    slot: Mutex<Option<String>>,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            slot: Mutex::new(None),
        }
    }

    /// Starts with a caller-provided session id (e.g. `--session` on the CLI).
    pub fn with_session(user_id: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            slot: Mutex::new(session_id),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the stored id, creating one via `create` if absent.
    ///
    /// The slot lock is held across the creation call, so concurrent callers
    /// serialize on it. On failure nothing is stored and a later call retries
    /// creation.
    pub async fn ensure<F, Fut>(&self, create: F) -> ApiResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<String>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }
        let id = create().await?;
        *slot = Some(id.clone());
        Ok(id)
    }

    /// Returns the current id without creating one.
    pub async fn current(&self) -> Option<String> {
        self.slot.lock().await.clone()
    }

    /// Stores an id confirmed by an authoritative response. The batch path
    /// can create a session server-side, in which case the id only shows up
    /// in the response metadata.
    pub async fn adopt(&self, session_id: &str) {
        if session_id.is_empty() {
            return;
        }
        let mut slot = self.slot.lock().await;
        *slot = Some(session_id.to_string());
    }

    /// Clears the stored id. The next `ensure` creates a fresh session.
    pub async fn reset(&self) {
        *self.slot.lock().await = None;
    }
}
