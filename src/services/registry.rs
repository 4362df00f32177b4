//! AgentRegistry - holds agent descriptors, status, and live performance.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentSpec, AgentStatus};

/// In-memory registry of agents known to one engine instance.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Agent>>,
    valid_domains: Vec<String>,
}

impl AgentRegistry {
    pub fn new(valid_domains: Vec<String>) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            valid_domains,
        }
    }

    /// Register a new agent. The returned id is either the caller-supplied
    /// one or a generated UUID.
    #[instrument(skip(self, spec), err)]
    pub async fn register(&self, spec: AgentSpec) -> DomainResult<String> {
        self.validate(&spec)?;

        let id = spec
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut agents = self.agents.write().await;
        if agents.contains_key(&id) {
            return Err(DomainError::InvalidAgent(format!(
                "agent id '{id}' already registered"
            )));
        }

        let agent = Agent::from_spec(id.clone(), spec);
        info!(agent_id = %id, domains = ?agent.domain_labels, "agent registered");
        agents.insert(id.clone(), agent);
        Ok(id)
    }

    fn validate(&self, spec: &AgentSpec) -> DomainResult<()> {
        if spec.domain_labels.is_empty() {
            return Err(DomainError::InvalidAgent(
                "domain_labels must not be empty".to_string(),
            ));
        }
        for domain in &spec.domain_labels {
            if !self.valid_domains.iter().any(|d| d == domain) {
                return Err(DomainError::InvalidAgent(format!(
                    "unknown domain '{domain}'"
                )));
            }
        }
        if spec.endpoint.trim().is_empty() {
            return Err(DomainError::InvalidAgent(
                "endpoint must not be empty".to_string(),
            ));
        }
        for (domain, score) in &spec.skill_scores {
            if !score.is_finite() || !(0.0..=10.0).contains(score) {
                return Err(DomainError::InvalidAgent(format!(
                    "skill score {score} for '{domain}' outside [0, 10]"
                )));
            }
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Agent> {
        self.agents.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn idle_agents(&self) -> Vec<Agent> {
        self.agents
            .read()
            .await
            .values()
            .filter(|a| a.is_idle())
            .cloned()
            .collect()
    }

    pub async fn mark_busy(&self, id: &str) -> DomainResult<()> {
        self.set_status(id, AgentStatus::Busy).await
    }

    pub async fn mark_idle(&self, id: &str) -> DomainResult<()> {
        self.set_status(id, AgentStatus::Idle).await
    }

    async fn set_status(&self, id: &str, status: AgentStatus) -> DomainResult<()> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| DomainError::UnknownAgent(id.to_string()))?;
        agent.status = status;
        Ok(())
    }

    /// Apply a mutation to one agent under the write lock. Used by the
    /// engine's learning updates.
    pub async fn update<F>(&self, id: &str, f: F) -> DomainResult<()>
    where
        F: FnOnce(&mut Agent),
    {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| DomainError::UnknownAgent(id.to_string()))?;
        f(agent);
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.agents.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AgentRegistry {
        AgentRegistry::new(vec!["analysis".to_string(), "logic".to_string()])
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = registry();
        let spec = AgentSpec::new(&["analysis"], "mock://a1")
            .with_id("a1")
            .with_skill("analysis", 8.0);

        let id = registry.register(spec).await.unwrap();
        assert_eq!(id, "a1");

        let agent = registry.get("a1").await.unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_register_generates_id_when_absent() {
        let registry = registry();
        let id = registry
            .register(AgentSpec::new(&["logic"], "mock://x"))
            .await
            .unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let registry = registry();
        let spec = AgentSpec::new(&["analysis"], "mock://a1").with_id("a1");
        registry.register(spec.clone()).await.unwrap();

        let err = registry.register(spec).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidAgent(_)));
    }

    #[tokio::test]
    async fn test_register_validations() {
        let registry = registry();

        // No domains.
        let spec = AgentSpec::new(&[], "mock://x");
        assert!(registry.register(spec).await.is_err());

        // Unknown domain.
        let spec = AgentSpec::new(&["astrology"], "mock://x");
        assert!(registry.register(spec).await.is_err());

        // Empty endpoint.
        let spec = AgentSpec::new(&["analysis"], "  ");
        assert!(registry.register(spec).await.is_err());

        // Out-of-range skill.
        let spec = AgentSpec::new(&["analysis"], "mock://x").with_skill("analysis", 12.0);
        assert!(registry.register(spec).await.is_err());

        // Non-finite skill.
        let spec = AgentSpec::new(&["analysis"], "mock://x").with_skill("analysis", f64::NAN);
        assert!(registry.register(spec).await.is_err());
    }

    #[tokio::test]
    async fn test_busy_idle_cycle() {
        let registry = registry();
        let id = registry
            .register(AgentSpec::new(&["analysis"], "mock://a"))
            .await
            .unwrap();

        registry.mark_busy(&id).await.unwrap();
        assert_eq!(registry.get(&id).await.unwrap().status, AgentStatus::Busy);
        assert!(registry.idle_agents().await.is_empty());

        registry.mark_idle(&id).await.unwrap();
        assert_eq!(registry.idle_agents().await.len(), 1);

        assert!(registry.mark_busy("ghost").await.is_err());
    }
}
