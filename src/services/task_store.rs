//! TaskStore - canonical flat set of tasks, keyed by id.
//!
//! Parent/child and dependency structure is kept as id lists over this
//! store, never as an object graph.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskSpec, TaskStatus};

/// In-memory store of tasks for one engine instance.
pub struct TaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    valid_domains: Vec<String>,
}

impl TaskStore {
    pub fn new(valid_domains: Vec<String>) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            valid_domains,
        }
    }

    /// Submit a new top-level task. Validation failures leave the store
    /// untouched. Identical specs yield distinct ids.
    #[instrument(skip(self, spec), fields(domain = %spec.domain), err)]
    pub async fn submit(&self, spec: TaskSpec, predicted_impact: f64) -> DomainResult<Uuid> {
        let task = Task::from_spec(spec, predicted_impact);
        task.validate(&self.valid_domains)?;

        let mut tasks = self.tasks.write().await;
        for dep in &task.dependencies {
            if !tasks.contains_key(dep) {
                return Err(DomainError::InvalidTask(format!(
                    "dependency {dep} not found"
                )));
            }
        }

        let id = task.id;
        info!(task_id = %id, priority = task.priority, "task submitted");
        tasks.insert(id, task);
        Ok(id)
    }

    /// Create a sub-task under `parent_id` and link it both ways.
    #[instrument(skip(self, spec), err)]
    pub async fn inject_subtask(
        &self,
        parent_id: Uuid,
        spec: TaskSpec,
        predicted_impact: f64,
    ) -> DomainResult<Uuid> {
        let child = Task::from_spec(spec, predicted_impact).with_parent(parent_id);
        child.validate(&self.valid_domains)?;

        let mut tasks = self.tasks.write().await;
        let parent = tasks
            .get_mut(&parent_id)
            .ok_or(DomainError::UnknownTask(parent_id))?;
        parent.subtasks.push(child.id);

        let id = child.id;
        info!(task_id = %id, parent_id = %parent_id, "sub-task injected");
        tasks.insert(id, child);
        Ok(id)
    }

    /// Insert a task as-is, trusting the caller. Exists so tests and
    /// recovery tooling can place state directly; the scheduler re-checks
    /// validity before dispatching anything from here.
    pub async fn insert(&self, task: Task) {
        self.tasks.write().await.insert(task.id, task);
    }

    pub async fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Replace a task wholesale under the write lock.
    pub async fn update(&self, task: Task) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        if !tasks.contains_key(&task.id) {
            return Err(DomainError::UnknownTask(task.id));
        }
        tasks.insert(task.id, task);
        Ok(())
    }

    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.values().cloned().collect()
    }

    pub async fn children_of(&self, parent_id: Uuid) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let Some(parent) = tasks.get(&parent_id) else {
            return Vec::new();
        };
        parent
            .subtasks
            .iter()
            .filter_map(|id| tasks.get(id).cloned())
            .collect()
    }

    /// Pending tasks whose dependencies are all completed and that have no
    /// sub-tasks, sorted by (priority desc, predicted impact desc).
    pub async fn ready_queue_snapshot(&self) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let completed: HashSet<Uuid> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Completed)
            .map(|t| t.id)
            .collect();

        let mut ready: Vec<Task> = tasks
            .values()
            .filter(|t| t.is_ready(&completed))
            .cloned()
            .collect();

        ready.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then(
                b.predicted_impact
                    .partial_cmp(&a.predicted_impact)
                    .unwrap_or(Ordering::Equal),
            )
        });
        ready
    }

    /// The processing task currently assigned to `agent_id`, if any.
    pub async fn processing_task_for_agent(&self, agent_id: &str) -> Option<Uuid> {
        self.tasks
            .read()
            .await
            .values()
            .find(|t| {
                t.status == TaskStatus::Processing && t.assigned_to.as_deref() == Some(agent_id)
            })
            .map(|t| t.id)
    }

    pub async fn count_by_status(&self, status: TaskStatus) -> usize {
        self.tasks
            .read()
            .await
            .values()
            .filter(|t| t.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TaskStore {
        TaskStore::new(vec!["analysis".to_string(), "logic".to_string()])
    }

    #[tokio::test]
    async fn test_submit_and_get() {
        let store = store();
        let id = store
            .submit(TaskSpec::new("inspect data", "analysis", 4), 3.2)
            .await
            .unwrap();

        let task = store.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.predicted_impact, 3.2);
    }

    #[tokio::test]
    async fn test_identical_specs_get_distinct_ids() {
        let store = store();
        let spec = TaskSpec::new("same work", "analysis", 4);
        let a = store.submit(spec.clone(), 1.0).await.unwrap();
        let b = store.submit(spec, 1.0).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let store = store();

        let err = store
            .submit(TaskSpec::new("", "analysis", 4), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTask(_)));

        assert!(store
            .submit(TaskSpec::new("t", "astrology", 4), 1.0)
            .await
            .is_err());
        assert!(store
            .submit(TaskSpec::new("t", "analysis", 0), 1.0)
            .await
            .is_err());
        assert!(store
            .submit(TaskSpec::new("t", "analysis", 11), 1.0)
            .await
            .is_err());

        // Missing dependency.
        let spec = TaskSpec::new("t", "analysis", 4).with_dependency(Uuid::new_v4());
        assert!(store.submit(spec, 1.0).await.is_err());

        // Nothing entered the store.
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_ready_queue_filters_and_orders() {
        let store = store();

        let dep = store
            .submit(TaskSpec::new("dep", "analysis", 2), 1.0)
            .await
            .unwrap();
        let blocked = store
            .submit(
                TaskSpec::new("blocked", "analysis", 2).with_dependency(dep),
                1.0,
            )
            .await
            .unwrap();
        let low = store
            .submit(TaskSpec::new("low", "analysis", 2).with_priority(1), 2.0)
            .await
            .unwrap();
        let high = store
            .submit(TaskSpec::new("high", "analysis", 2).with_priority(8), 1.0)
            .await
            .unwrap();
        let impactful = store
            .submit(TaskSpec::new("imp", "analysis", 2).with_priority(1), 9.0)
            .await
            .unwrap();

        let ready = store.ready_queue_snapshot().await;
        let ids: Vec<Uuid> = ready.iter().map(|t| t.id).collect();

        assert!(!ids.contains(&blocked));
        assert_eq!(ids[0], high);
        // Equal priority breaks ties on predicted impact.
        assert_eq!(ids[1], impactful);
        assert!(ids.contains(&low) && ids.contains(&dep));

        // Completing the dependency readies the blocked task.
        let mut dep_task = store.get(dep).await.unwrap();
        dep_task.status = TaskStatus::Completed;
        store.update(dep_task).await.unwrap();
        let ready_ids: Vec<Uuid> = store
            .ready_queue_snapshot()
            .await
            .iter()
            .map(|t| t.id)
            .collect();
        assert!(ready_ids.contains(&blocked));
    }

    #[tokio::test]
    async fn test_inject_subtask_links_both_ways() {
        let store = store();
        let parent = store
            .submit(TaskSpec::new("parent", "analysis", 8), 5.0)
            .await
            .unwrap();

        let child = store
            .inject_subtask(parent, TaskSpec::new("half", "analysis", 4), 2.0)
            .await
            .unwrap();

        let parent_task = store.get(parent).await.unwrap();
        assert_eq!(parent_task.subtasks, vec![child]);
        assert_eq!(store.get(child).await.unwrap().parent_id, Some(parent));

        // A parent with sub-tasks is filtered from the ready queue.
        let ready_ids: Vec<Uuid> = store
            .ready_queue_snapshot()
            .await
            .iter()
            .map(|t| t.id)
            .collect();
        assert!(!ready_ids.contains(&parent));
        assert!(ready_ids.contains(&child));
    }

    #[tokio::test]
    async fn test_inject_subtask_unknown_parent() {
        let store = store();
        let err = store
            .inject_subtask(Uuid::new_v4(), TaskSpec::new("x", "analysis", 2), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownTask(_)));
    }
}
