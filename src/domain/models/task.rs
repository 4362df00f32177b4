//! Task domain model.
//!
//! Tasks are discrete units of work in a single domain. They form a DAG
//! through dependency edges and a tree through sub-task decomposition, both
//! kept as flat id lists over the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

use super::resource::ResourceMode;

/// Status of a task in the scheduling pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Defined, waiting to be picked up.
    Pending,
    /// Dispatched to exactly one busy agent.
    Processing,
    /// Decomposed; terminal lifecycle is derived from sub-tasks.
    WaitingForSubtasks,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully; see the attached failure reason.
    Failed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::WaitingForSubtasks => "waiting_for_subtasks",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<TaskStatus> {
        match self {
            Self::Pending => vec![Self::Processing, Self::WaitingForSubtasks, Self::Failed],
            // Back to Pending on reassignment.
            Self::Processing => vec![Self::Completed, Self::Failed, Self::Pending],
            Self::WaitingForSubtasks => vec![Self::Completed, Self::Failed],
            Self::Completed => vec![],
            Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal reason attached to a failed task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    CyclicDependencyFailure,
    DependencyFailureCascade,
    MaxRetriesExhausted,
    LowConfidenceAbort,
    MalformedDispatchResult,
    InvalidTask,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CyclicDependencyFailure => "CYCLIC_DEPENDENCY_FAILURE",
            Self::DependencyFailureCascade => "DEPENDENCY_FAILURE_CASCADE",
            Self::MaxRetriesExhausted => "MAX_RETRIES_EXHAUSTED",
            Self::LowConfidenceAbort => "LOW_CONFIDENCE_ABORT",
            Self::MalformedDispatchResult => "MALFORMED_DISPATCH_RESULT",
            Self::InvalidTask => "INVALID_TASK",
        };
        write!(f, "{s}")
    }
}

/// Scheduler response to a low-prediction assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    Split,
    Collaborate,
    Reroute,
}

/// Hint tagged onto a task by remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedAction {
    UseCollaborationProtocol,
}

/// Validated execution output stored on a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub result_data: String,
    pub confidence_score: f64,
    pub actual_impact: f64,
    pub execution_time_ms: u64,
}

/// Submission schema for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub description: String,
    pub domain: String,
    /// Difficulty in [1, 10].
    pub complexity: u8,
    /// Defaults to 1; capped at 10 wherever the engine raises it.
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    /// Domains whose concurrent or prior activity degrades this task.
    #[serde(default)]
    pub interfered_by: Vec<String>,
    #[serde(default)]
    pub resource_requirements: HashMap<String, ResourceMode>,
}

impl TaskSpec {
    pub fn new(description: impl Into<String>, domain: impl Into<String>, complexity: u8) -> Self {
        Self {
            description: description.into(),
            domain: domain.into(),
            complexity,
            priority: None,
            dependencies: Vec::new(),
            interfered_by: Vec::new(),
            resource_requirements: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_dependency(mut self, task_id: Uuid) -> Self {
        if !self.dependencies.contains(&task_id) {
            self.dependencies.push(task_id);
        }
        self
    }

    pub fn with_interference(mut self, domain: impl Into<String>) -> Self {
        self.interfered_by.push(domain.into());
        self
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>, mode: ResourceMode) -> Self {
        self.resource_requirements.insert(resource_id.into(), mode);
        self
    }
}

/// A unit of work tracked by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub domain: String,
    pub complexity: u8,
    pub priority: i64,
    pub dependencies: Vec<Uuid>,
    pub subtasks: Vec<Uuid>,
    pub parent_id: Option<Uuid>,
    pub interfered_by: Vec<String>,
    pub resource_requirements: HashMap<String, ResourceMode>,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub retry_count: u32,
    /// Agents that already failed this task; excluded from reassignment.
    pub failed_agents: HashSet<String>,
    /// Estimated at submission, before any execution.
    pub predicted_impact: f64,
    /// Estimated per dispatch for the chosen agent.
    pub predicted_success: Option<f64>,
    pub collaborative: bool,
    pub suggested_action: Option<SuggestedAction>,
    pub failure_reason: Option<FailureReason>,
    pub output: Option<TaskOutput>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a task from a spec. Validation happens at the store boundary.
    pub fn from_spec(spec: TaskSpec, predicted_impact: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: spec.description,
            domain: spec.domain,
            complexity: spec.complexity,
            priority: spec.priority.unwrap_or(1),
            dependencies: spec.dependencies,
            subtasks: Vec::new(),
            parent_id: None,
            interfered_by: spec.interfered_by,
            resource_requirements: spec.resource_requirements,
            status: TaskStatus::default(),
            assigned_to: None,
            retry_count: 0,
            failed_agents: HashSet::new(),
            predicted_impact,
            predicted_success: None,
            collaborative: false,
            suggested_action: None,
            failure_reason: None,
            output: None,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// A task is ready when it is pending, has no sub-tasks of its own, and
    /// every dependency in `completed` has finished successfully.
    pub fn is_ready(&self, completed: &HashSet<Uuid>) -> bool {
        self.status == TaskStatus::Pending
            && self.subtasks.is_empty()
            && self.dependencies.iter().all(|d| completed.contains(d))
    }

    pub fn can_transition_to(&self, new_status: TaskStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Guarded status transition; keeps timestamps in step.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<(), crate::DomainError> {
        if !self.can_transition_to(new_status) {
            return Err(crate::DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }
        self.status = new_status;
        match new_status {
            TaskStatus::Processing => self.started_at = Some(Utc::now()),
            TaskStatus::Completed | TaskStatus::Failed => {
                self.completed_at = Some(Utc::now());
            }
            _ => {}
        }
        Ok(())
    }

    /// Structural validation against the configured domain set.
    ///
    /// Runs at submission, and again before dispatch so state injected
    /// behind the store's back is refused rather than executed.
    pub fn validate(&self, valid_domains: &[String]) -> Result<(), crate::DomainError> {
        if self.description.trim().is_empty() {
            return Err(crate::DomainError::InvalidTask(
                "description must not be empty".to_string(),
            ));
        }
        if !valid_domains.iter().any(|d| d == &self.domain) {
            return Err(crate::DomainError::InvalidTask(format!(
                "unknown domain '{}'",
                self.domain
            )));
        }
        if !(1..=10).contains(&self.complexity) {
            return Err(crate::DomainError::InvalidTask(format!(
                "complexity {} outside [1, 10]",
                self.complexity
            )));
        }
        if self.priority < 0 {
            return Err(crate::DomainError::InvalidTask(format!(
                "priority {} must not be negative",
                self.priority
            )));
        }
        if self.dependencies.contains(&self.id) {
            return Err(crate::DomainError::InvalidTask(
                "task cannot depend on itself".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> Vec<String> {
        vec!["analysis".to_string(), "logic".to_string()]
    }

    #[test]
    fn test_task_from_spec_defaults() {
        let task = Task::from_spec(TaskSpec::new("summarize logs", "analysis", 4), 3.0);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, 1);
        assert_eq!(task.retry_count, 0);
        assert!(task.failed_agents.is_empty());
        assert_eq!(task.predicted_impact, 3.0);
    }

    #[test]
    fn test_task_transitions() {
        let mut task = Task::from_spec(TaskSpec::new("t", "analysis", 2), 1.0);

        task.transition_to(TaskStatus::Processing).unwrap();
        assert!(task.started_at.is_some());

        // Reassignment path back to pending is allowed.
        task.transition_to(TaskStatus::Pending).unwrap();

        task.transition_to(TaskStatus::Processing).unwrap();
        task.transition_to(TaskStatus::Completed).unwrap();
        assert!(task.completed_at.is_some());

        // Completed is final.
        assert!(task.transition_to(TaskStatus::Pending).is_err());
        assert!(task.transition_to(TaskStatus::Failed).is_err());
    }

    #[test]
    fn test_ready_rule() {
        let dep = Uuid::new_v4();
        let mut task = Task::from_spec(
            TaskSpec::new("t", "analysis", 2).with_dependency(dep),
            1.0,
        );

        let mut completed = HashSet::new();
        assert!(!task.is_ready(&completed));

        completed.insert(dep);
        assert!(task.is_ready(&completed));

        // A decomposed parent is never ready.
        task.subtasks.push(Uuid::new_v4());
        assert!(!task.is_ready(&completed));
    }

    #[test]
    fn test_validate() {
        let ok = Task::from_spec(TaskSpec::new("t", "analysis", 5), 1.0);
        assert!(ok.validate(&domains()).is_ok());

        let blank = Task::from_spec(TaskSpec::new("   ", "analysis", 5), 1.0);
        assert!(blank.validate(&domains()).is_err());

        let unknown = Task::from_spec(TaskSpec::new("t", "astrology", 5), 1.0);
        assert!(unknown.validate(&domains()).is_err());

        let too_hard = Task::from_spec(TaskSpec::new("t", "analysis", 11), 1.0);
        assert!(too_hard.validate(&domains()).is_err());

        let zero = Task::from_spec(TaskSpec::new("t", "analysis", 0), 1.0);
        assert!(zero.validate(&domains()).is_err());
    }

    #[test]
    fn test_failure_reason_wire_format() {
        assert_eq!(
            FailureReason::CyclicDependencyFailure.to_string(),
            "CYCLIC_DEPENDENCY_FAILURE"
        );
        assert_eq!(
            serde_json::to_string(&FailureReason::MaxRetriesExhausted).unwrap(),
            "\"MAX_RETRIES_EXHAUSTED\""
        );
    }
}
