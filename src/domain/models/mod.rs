pub mod agent;
pub mod dispatch;
pub mod record;
pub mod resource;
pub mod task;

pub use agent::{Agent, AgentSpec, AgentStatus, DomainPerformance, PerformanceStats};
pub use dispatch::DispatchResult;
pub use record::ExecutionRecord;
pub use resource::{ResourceDescriptor, ResourceMode};
pub use task::{
    FailureReason, RemediationAction, SuggestedAction, Task, TaskOutput, TaskSpec, TaskStatus,
};
