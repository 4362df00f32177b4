pub mod aggregator;
pub mod collaboration;
pub mod compatibility;
pub mod config;
pub mod dependency_graph;
pub mod engine;
pub mod execution_log;
pub mod reflection;
pub mod registry;
pub mod resource_arbiter;
pub mod task_store;

pub use aggregator::{SubtaskAggregator, AGGREGATOR_AGENT_ID};
pub use collaboration::CollaborationBus;
pub use compatibility::CompatibilityScorer;
pub use config::{ConfigError, EngineConfig};
pub use dependency_graph::DependencyGraph;
pub use engine::{Engine, EngineEvent, EngineStats, EngineStatus};
pub use execution_log::ExecutionLog;
pub use reflection::MetaReflection;
pub use registry::AgentRegistry;
pub use resource_arbiter::ResourceArbiter;
pub use task_store::TaskStore;
