//! Conductor - task orchestration core.
//!
//! Dispatches heterogeneous units of work to a pool of registered agents
//! under compatibility, dependency, resource, priority, and
//! predictive-quality constraints. Agents are reached through an opaque
//! [`Dispatcher`](domain::ports::Dispatcher) capability; everything else
//! (matching, ordering, retries, decomposition, learning) lives here.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use services::config::{ConfigError, EngineConfig};
pub use services::engine::{Engine, EngineEvent, EngineStats, EngineStatus};
