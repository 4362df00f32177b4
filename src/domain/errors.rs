//! Domain errors for the conductor engine.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to callers of the engine's public operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid agent: {0}")]
    InvalidAgent(String),

    #[error("Task not found: {0}")]
    UnknownTask(Uuid),

    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type DomainResult<T> = Result<T, DomainError>;
