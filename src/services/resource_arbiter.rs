//! ResourceArbiter - named resource leases with exclusive or
//! bounded-parallel semantics.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{ResourceDescriptor, ResourceMode};

/// Ledger of named resources and their current holders.
///
/// Acquisition is atomic across all requested resources: either every
/// lease is granted or none is, so a task can never deadlock holding a
/// partial set.
pub struct ResourceArbiter {
    resources: RwLock<HashMap<String, ResourceDescriptor>>,
}

impl ResourceArbiter {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
        }
    }

    /// Register a resource ahead of time. Capacity is pinned to 1 for
    /// exclusive resources.
    pub async fn register(&self, id: impl Into<String>, mode: ResourceMode, capacity: u32) {
        let descriptor = ResourceDescriptor::new(id, mode, capacity);
        self.resources
            .write()
            .await
            .insert(descriptor.id.clone(), descriptor);
    }

    /// Try to acquire every requested lease for `task_id`, all or nothing.
    ///
    /// Requirements naming an unregistered resource register it on first
    /// use with the requested mode.
    pub async fn try_acquire(
        &self,
        task_id: Uuid,
        requirements: &HashMap<String, ResourceMode>,
    ) -> bool {
        if requirements.is_empty() {
            return true;
        }

        let mut resources = self.resources.write().await;

        for (id, mode) in requirements {
            let descriptor = resources
                .entry(id.clone())
                .or_insert_with(|| ResourceDescriptor::new(id.clone(), *mode, 1));
            if !descriptor.holders.contains(&task_id) && !descriptor.has_free_capacity() {
                debug!(task_id = %task_id, resource = %id, "resource unavailable");
                return false;
            }
        }

        for id in requirements.keys() {
            if let Some(descriptor) = resources.get_mut(id) {
                descriptor.acquire(task_id);
            }
        }
        true
    }

    /// Release every lease held by `task_id`.
    pub async fn release(&self, task_id: Uuid) {
        let mut resources = self.resources.write().await;
        for descriptor in resources.values_mut() {
            descriptor.release(task_id);
        }
    }

    pub async fn get(&self, id: &str) -> Option<ResourceDescriptor> {
        self.resources.read().await.get(id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<ResourceDescriptor> {
        self.resources.read().await.values().cloned().collect()
    }
}

impl Default for ResourceArbiter {
    fn default() -> Self {
        Self::new()
    }
}
