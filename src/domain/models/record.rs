//! Append-only execution record, emitted on terminal transitions and
//! aggregation. Durable storage of the stream is an external concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Task, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub timestamp: DateTime<Utc>,
    pub task_id: Uuid,
    pub agent_id: Option<String>,
    pub domain: String,
    pub predicted_impact: f64,
    pub actual_impact: Option<f64>,
    pub confidence_score: Option<f64>,
    pub execution_time_ms: Option<u64>,
    pub dependencies: Vec<Uuid>,
    pub collaboration: bool,
    pub status: TaskStatus,
    pub failure_reason: Option<String>,
}

impl ExecutionRecord {
    /// Snapshot a task at a terminal transition or aggregation point.
    pub fn from_task(task: &Task) -> Self {
        Self {
            timestamp: Utc::now(),
            task_id: task.id,
            agent_id: task.assigned_to.clone(),
            domain: task.domain.clone(),
            predicted_impact: task.predicted_impact,
            actual_impact: task.output.as_ref().map(|o| o.actual_impact),
            confidence_score: task.output.as_ref().map(|o| o.confidence_score),
            execution_time_ms: task.output.as_ref().map(|o| o.execution_time_ms),
            dependencies: task.dependencies.clone(),
            collaboration: task.collaborative,
            status: task.status,
            failure_reason: task.failure_reason.map(|r| r.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::task::TaskSpec;

    #[test]
    fn test_record_snapshots_task_fields() {
        let mut task = Task::from_spec(TaskSpec::new("t", "analysis", 3), 2.5);
        task.assigned_to = Some("a1".to_string());
        task.status = TaskStatus::Completed;

        let record = ExecutionRecord::from_task(&task);
        assert_eq!(record.task_id, task.id);
        assert_eq!(record.agent_id.as_deref(), Some("a1"));
        assert_eq!(record.predicted_impact, 2.5);
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.actual_impact.is_none());
    }
}
