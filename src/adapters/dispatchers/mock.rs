//! Mock dispatcher for testing and embedding demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{Agent, Task};
use crate::domain::ports::{DispatchError, Dispatcher};

/// Configured outcome for one dispatch call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Well-formed success payload.
    Success {
        result_data: String,
        confidence_score: f64,
        actual_impact: f64,
        execution_time_ms: u64,
    },
    /// Outright rejection.
    Reject(String),
    /// Arbitrary raw payload, for corrupt-result scenarios.
    Payload(Value),
}

impl MockOutcome {
    pub fn success(result_data: impl Into<String>) -> Self {
        Self::Success {
            result_data: result_data.into(),
            confidence_score: 0.9,
            actual_impact: 5.0,
            execution_time_ms: 120,
        }
    }

    pub fn with_confidence(result_data: impl Into<String>, confidence_score: f64) -> Self {
        Self::Success {
            result_data: result_data.into(),
            confidence_score,
            actual_impact: 5.0,
            execution_time_ms: 120,
        }
    }

    pub fn with_metrics(
        result_data: impl Into<String>,
        confidence_score: f64,
        actual_impact: f64,
        execution_time_ms: u64,
    ) -> Self {
        Self::Success {
            result_data: result_data.into(),
            confidence_score,
            actual_impact,
            execution_time_ms,
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Self::Reject(message.into())
    }

    /// A payload whose numeric fields are null, as NaN arrives over JSON.
    pub fn corrupt() -> Self {
        Self::Payload(json!({
            "resultData": "corrupt",
            "confidenceScore": null,
            "actualImpact": 1.0,
            "executionTime": 10,
        }))
    }
}

impl Default for MockOutcome {
    fn default() -> Self {
        Self::success("mock dispatch completed")
    }
}

/// A dispatch call observed by the mock.
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub task_id: Uuid,
    pub agent_id: String,
    pub at: DateTime<Utc>,
}

/// Mock dispatcher.
///
/// Per-task outcomes are queued and consumed one per dispatch, falling back
/// to the default outcome when the queue is empty. Every call is recorded
/// for assertions.
pub struct MockDispatcher {
    default_outcome: MockOutcome,
    overrides: RwLock<HashMap<Uuid, VecDeque<MockOutcome>>>,
    calls: RwLock<Vec<DispatchCall>>,
    delay: Option<Duration>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self {
            default_outcome: MockOutcome::default(),
            overrides: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_default_outcome(outcome: MockOutcome) -> Self {
        Self {
            default_outcome: outcome,
            ..Self::new()
        }
    }

    /// Simulate slow agents; useful for overlapping in-flight dispatches.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an outcome for a specific task. Multiple calls queue multiple
    /// attempts in order.
    pub async fn push_outcome_for_task(&self, task_id: Uuid, outcome: MockOutcome) {
        self.overrides
            .write()
            .await
            .entry(task_id)
            .or_default()
            .push_back(outcome);
    }

    pub async fn calls(&self) -> Vec<DispatchCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn next_outcome(&self, task_id: Uuid) -> MockOutcome {
        let mut overrides = self.overrides.write().await;
        overrides
            .get_mut(&task_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn dispatch(&self, agent: &Agent, task: &Task) -> Result<Value, DispatchError> {
        self.calls.write().await.push(DispatchCall {
            task_id: task.id,
            agent_id: agent.id.clone(),
            at: Utc::now(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_outcome(task.id).await {
            MockOutcome::Success {
                result_data,
                confidence_score,
                actual_impact,
                execution_time_ms,
            } => Ok(json!({
                "resultData": result_data,
                "confidenceScore": confidence_score,
                "actualImpact": actual_impact,
                "executionTime": execution_time_ms,
            })),
            MockOutcome::Reject(message) => Err(DispatchError::Rejected(message)),
            MockOutcome::Payload(value) => Ok(value),
        }
    }
}
