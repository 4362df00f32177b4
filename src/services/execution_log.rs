//! ExecutionLog - in-memory append-only sink for execution records.
//!
//! Durable storage is an external collaborator; this service is the
//! process-local buffer that external sinks drain.

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::ExecutionRecord;

pub struct ExecutionLog {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn append(&self, record: ExecutionRecord) {
        debug!(task_id = %record.task_id, status = %record.status, "execution record appended");
        self.records.write().await.push(record);
    }

    pub async fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.records.read().await.clone()
    }

    pub async fn for_task(&self, task_id: Uuid) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.task_id == task_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new()
    }
}
