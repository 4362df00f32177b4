//! Collaboration bus - a shared blackboard per parent context.
//!
//! Consumers poll or are handed shared results on request; there is no
//! callback graph. Every operation appends to an audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A result shared into a context by one task's agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedResult {
    pub agent_id: String,
    pub data: String,
    pub shared_at: DateTime<Utc>,
}

/// A pending request for input that no shared result satisfied yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRequest {
    pub requester: Uuid,
    pub description: String,
    pub requested_at: DateTime<Utc>,
}

/// Blackboard state for one collaboration context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollaborationContext {
    pub shared_results: HashMap<Uuid, SharedResult>,
    pub requests: Vec<InputRequest>,
    pub sync_points: HashMap<Uuid, serde_json::Value>,
}

/// Kind of bus operation, for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationAction {
    Shared,
    Requested,
    Fulfilled,
    Synced,
}

/// One entry of the append-only collaboration log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub context_id: Uuid,
    pub task_id: Uuid,
    pub action: CollaborationAction,
    pub detail: String,
}

/// Shared blackboard keyed by context id (the parent task id, or the task's
/// own id when it has no parent).
pub struct CollaborationBus {
    contexts: RwLock<HashMap<Uuid, CollaborationContext>>,
    log: RwLock<Vec<CollaborationLogEntry>>,
}

impl CollaborationBus {
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            log: RwLock::new(Vec::new()),
        }
    }

    /// Share a task's result into its context.
    pub async fn share(
        &self,
        context_id: Uuid,
        task_id: Uuid,
        agent_id: impl Into<String>,
        data: impl Into<String>,
    ) {
        let agent_id = agent_id.into();
        let data = data.into();
        {
            let mut contexts = self.contexts.write().await;
            contexts.entry(context_id).or_default().shared_results.insert(
                task_id,
                SharedResult {
                    agent_id: agent_id.clone(),
                    data: data.clone(),
                    shared_at: Utc::now(),
                },
            );
        }
        self.append(context_id, task_id, CollaborationAction::Shared, data)
            .await;
    }

    /// Ask the context for input. Returns the most recent shared result
    /// synchronously when one exists; otherwise the request is queued for a
    /// later contributor.
    pub async fn request_input(
        &self,
        context_id: Uuid,
        requester: Uuid,
        description: impl Into<String>,
    ) -> Option<SharedResult> {
        let description = description.into();
        let mut contexts = self.contexts.write().await;
        let context = contexts.entry(context_id).or_default();

        let latest = context
            .shared_results
            .values()
            .max_by_key(|r| r.shared_at)
            .cloned();

        let action = if latest.is_some() {
            CollaborationAction::Fulfilled
        } else {
            context.requests.push(InputRequest {
                requester,
                description: description.clone(),
                requested_at: Utc::now(),
            });
            CollaborationAction::Requested
        };
        drop(contexts);

        self.append(context_id, requester, action, description).await;
        latest
    }

    /// Record a sync point for a task within its context.
    pub async fn sync(&self, context_id: Uuid, task_id: Uuid, payload: serde_json::Value) {
        {
            let mut contexts = self.contexts.write().await;
            contexts
                .entry(context_id)
                .or_default()
                .sync_points
                .insert(task_id, payload.clone());
        }
        self.append(
            context_id,
            task_id,
            CollaborationAction::Synced,
            payload.to_string(),
        )
        .await;
    }

    /// Everything shared into a context, oldest first.
    pub async fn shared_contributions(&self, context_id: Uuid) -> Vec<SharedResult> {
        let contexts = self.contexts.read().await;
        let Some(context) = contexts.get(&context_id) else {
            return Vec::new();
        };
        let mut results: Vec<SharedResult> = context.shared_results.values().cloned().collect();
        results.sort_by_key(|r| r.shared_at);
        results
    }

    pub async fn pending_requests(&self, context_id: Uuid) -> Vec<InputRequest> {
        let contexts = self.contexts.read().await;
        contexts
            .get(&context_id)
            .map(|c| c.requests.clone())
            .unwrap_or_default()
    }

    pub async fn log_snapshot(&self) -> Vec<CollaborationLogEntry> {
        self.log.read().await.clone()
    }

    async fn append(
        &self,
        context_id: Uuid,
        task_id: Uuid,
        action: CollaborationAction,
        detail: String,
    ) {
        self.log.write().await.push(CollaborationLogEntry {
            timestamp: Utc::now(),
            context_id,
            task_id,
            action,
            detail,
        });
    }
}

impl Default for CollaborationBus {
    fn default() -> Self {
        Self::new()
    }
}
