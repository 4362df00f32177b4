//! Dispatcher port - the opaque capability that executes a task on an agent.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{Agent, Task};

/// Failure of a dispatch attempt, as seen from the engine.
///
/// A timeout imposed by the implementation surfaces as a rejection and
/// enters the normal retry path.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch rejected: {0}")]
    Rejected(String),

    #[error("Dispatch timed out after {0} ms")]
    Timeout(u64),

    #[error("Agent endpoint unreachable: {0}")]
    Unreachable(String),
}

/// Trait for dispatch implementations.
///
/// The returned payload is deliberately untyped; the engine validates it
/// structurally before use (see
/// [`DispatchResult`](crate::domain::models::DispatchResult)).
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Get the dispatcher implementation name.
    fn name(&self) -> &'static str;

    /// Execute `task` on `agent` and return the raw result payload.
    async fn dispatch(&self, agent: &Agent, task: &Task)
        -> Result<serde_json::Value, DispatchError>;
}
