//! SubtaskAggregator - derives parent completion from sub-task outcomes.
//!
//! Parents of sub-tasks are never dispatched; their terminal lifecycle is
//! composed here from their children and the collaboration blackboard.

use tracing::info;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{FailureReason, TaskOutput, TaskStatus};
use crate::services::collaboration::CollaborationBus;
use crate::services::task_store::TaskStore;

/// Agent id recorded on aggregated parent outputs.
pub const AGGREGATOR_AGENT_ID: &str = "AGGREGATOR_SYSTEM";

#[derive(Debug, Clone, Default)]
pub struct SubtaskAggregator;

impl SubtaskAggregator {
    pub fn new() -> Self {
        Self
    }

    /// React to a child reaching `Completed`.
    ///
    /// Walks upward from `parent_id`, completing every ancestor whose
    /// children have all finished. Returns the ids of parents completed,
    /// innermost first.
    pub async fn on_child_completed(
        &self,
        parent_id: Uuid,
        store: &TaskStore,
        bus: &CollaborationBus,
    ) -> DomainResult<Vec<Uuid>> {
        let mut completed = Vec::new();
        let mut current = Some(parent_id);

        while let Some(pid) = current {
            let Some(mut parent) = store.get(pid).await else {
                break;
            };
            if parent.status != TaskStatus::WaitingForSubtasks {
                break;
            }

            let children = store.children_of(pid).await;
            if children.is_empty()
                || children.iter().any(|c| c.status != TaskStatus::Completed)
            {
                break;
            }

            let outputs: Vec<&TaskOutput> =
                children.iter().filter_map(|c| c.output.as_ref()).collect();
            let divisor = outputs.len().max(1) as f64;

            let mut result_data = outputs
                .iter()
                .map(|o| o.result_data.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            for contribution in bus.shared_contributions(pid).await {
                result_data.push_str(&format!(
                    "\n[{}] {}",
                    contribution.agent_id, contribution.data
                ));
            }

            let confidence_score =
                outputs.iter().map(|o| o.confidence_score).sum::<f64>() / divisor;
            let actual_impact = outputs.iter().map(|o| o.actual_impact).sum::<f64>() / divisor;
            let execution_time_ms = outputs.iter().map(|o| o.execution_time_ms).sum();
            let predicted_impact = children.iter().map(|c| c.predicted_impact).sum::<f64>()
                / children.len() as f64;

            parent.output = Some(TaskOutput {
                result_data,
                confidence_score,
                actual_impact,
                execution_time_ms,
            });
            parent.predicted_impact = predicted_impact;
            parent.assigned_to = Some(AGGREGATOR_AGENT_ID.to_string());
            parent.transition_to(TaskStatus::Completed)?;
            store.update(parent.clone()).await?;

            info!(
                parent_id = %pid,
                children = children.len(),
                confidence = confidence_score,
                "sub-task outputs aggregated"
            );
            completed.push(pid);
            current = parent.parent_id;
        }

        Ok(completed)
    }

    /// React to a child reaching `Failed`: the parent cannot complete, so
    /// it fails, and the failure recurses upward. Returns the ids of
    /// parents failed, innermost first.
    pub async fn on_child_failed(
        &self,
        parent_id: Uuid,
        store: &TaskStore,
    ) -> DomainResult<Vec<Uuid>> {
        let mut failed = Vec::new();
        let mut current = Some(parent_id);

        while let Some(pid) = current {
            let Some(mut parent) = store.get(pid).await else {
                break;
            };
            if parent.is_terminal() {
                break;
            }

            parent.failure_reason = Some(FailureReason::DependencyFailureCascade);
            parent.transition_to(TaskStatus::Failed)?;
            store.update(parent.clone()).await?;
            failed.push(pid);
            current = parent.parent_id;
        }

        Ok(failed)
    }
}
