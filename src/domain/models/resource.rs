//! Named resources with exclusive or bounded-parallel semantics.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Sharing semantics for a named resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// At most one holder at a time.
    Exclusive,
    /// Up to `capacity` concurrent holders.
    Parallel,
}

/// Ledger entry for one registered resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,
    pub mode: ResourceMode,
    pub capacity: u32,
    pub current_usage: u32,
    pub holders: HashSet<Uuid>,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<String>, mode: ResourceMode, capacity: u32) -> Self {
        let capacity = match mode {
            ResourceMode::Exclusive => 1,
            ResourceMode::Parallel => capacity.max(1),
        };
        Self {
            id: id.into(),
            mode,
            capacity,
            current_usage: 0,
            holders: HashSet::new(),
        }
    }

    pub fn has_free_capacity(&self) -> bool {
        self.current_usage < self.capacity
    }

    /// Record `task_id` as a holder. Holding is idempotent per task.
    pub fn acquire(&mut self, task_id: Uuid) -> bool {
        if self.holders.contains(&task_id) {
            return true;
        }
        if !self.has_free_capacity() {
            return false;
        }
        self.holders.insert(task_id);
        self.current_usage += 1;
        true
    }

    pub fn release(&mut self, task_id: Uuid) {
        if self.holders.remove(&task_id) {
            self.current_usage = self.current_usage.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_capacity_pinned_to_one() {
        let r = ResourceDescriptor::new("gpu", ResourceMode::Exclusive, 8);
        assert_eq!(r.capacity, 1);
    }

    #[test]
    fn test_acquire_release() {
        let mut r = ResourceDescriptor::new("db", ResourceMode::Parallel, 2);
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let t3 = Uuid::new_v4();

        assert!(r.acquire(t1));
        assert!(r.acquire(t2));
        assert!(!r.acquire(t3));
        assert_eq!(r.current_usage, 2);

        // Re-acquiring an already-held lease does not double-count.
        assert!(r.acquire(t1));
        assert_eq!(r.current_usage, 2);

        r.release(t1);
        assert!(r.acquire(t3));
        assert_eq!(r.current_usage, 2);
    }

    #[test]
    fn test_release_unknown_holder_is_noop() {
        let mut r = ResourceDescriptor::new("db", ResourceMode::Exclusive, 1);
        r.release(Uuid::new_v4());
        assert_eq!(r.current_usage, 0);
    }
}
