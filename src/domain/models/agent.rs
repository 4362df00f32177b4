//! Agent domain model.
//!
//! An agent is an executor described by its domain coverage and skill
//! vector, reached through an opaque endpoint handle. The engine mutates
//! only its status; performance stats are mutated only by learning updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Agent status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Busy,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "busy" => Ok(Self::Busy),
            _ => Err(anyhow::anyhow!("Invalid agent status: {s}")),
        }
    }
}

/// Per-domain execution history for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainPerformance {
    pub tasks_completed: u64,
    /// Running mean of success outcomes, in [0, 1].
    pub success_rate: f64,
    /// Running mean of actual impact over successful executions.
    pub average_impact: f64,
    /// Shrinks as 1/(n+1) with accumulated history, in (0, 1].
    pub uncertainty: f64,
    pub confidence: f64,
}

impl Default for DomainPerformance {
    fn default() -> Self {
        Self {
            tasks_completed: 0,
            success_rate: 0.5,
            average_impact: 0.0,
            uncertainty: 1.0,
            confidence: 0.0,
        }
    }
}

/// Performance stats: per-domain history plus global rollups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceStats {
    pub domains: HashMap<String, DomainPerformance>,
    pub tasks_completed: u64,
    pub success_rate: f64,
    pub average_impact: f64,
    pub last_active: Option<DateTime<Utc>>,
}

impl PerformanceStats {
    /// Per-domain history for `domain`, or defaults when the agent has none.
    pub fn domain(&self, domain: &str) -> DomainPerformance {
        self.domains.get(domain).cloned().unwrap_or_default()
    }
}

/// Submission schema for registering an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Caller-supplied id; a UUID is generated when absent.
    pub id: Option<String>,
    pub domain_labels: Vec<String>,
    /// Mapping domain -> skill score in [0, 10].
    pub skill_scores: HashMap<String, f64>,
    /// Opaque endpoint handle; the engine never interprets it.
    pub endpoint: String,
    /// Optional performance seed carried over from a previous deployment.
    pub performance: Option<PerformanceStats>,
}

impl AgentSpec {
    pub fn new(domains: &[&str], endpoint: impl Into<String>) -> Self {
        Self {
            id: None,
            domain_labels: domains.iter().map(|d| d.to_string()).collect(),
            skill_scores: HashMap::new(),
            endpoint: endpoint.into(),
            performance: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_skill(mut self, domain: impl Into<String>, score: f64) -> Self {
        self.skill_scores.insert(domain.into(), score);
        self
    }

    pub fn with_performance(mut self, seed: PerformanceStats) -> Self {
        self.performance = Some(seed);
        self
    }
}

/// A registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub domain_labels: Vec<String>,
    pub skill_scores: HashMap<String, f64>,
    pub endpoint: String,
    pub status: AgentStatus,
    pub performance: PerformanceStats,
    pub registered_at: DateTime<Utc>,
}

impl Agent {
    /// Build a registered agent from a validated spec.
    pub fn from_spec(id: String, spec: AgentSpec) -> Self {
        Self {
            id,
            domain_labels: spec.domain_labels,
            skill_scores: spec.skill_scores,
            endpoint: spec.endpoint,
            status: AgentStatus::Idle,
            performance: spec.performance.unwrap_or_default(),
            registered_at: Utc::now(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == AgentStatus::Idle
    }

    pub fn covers_domain(&self, domain: &str) -> bool {
        self.domain_labels.iter().any(|d| d == domain)
    }
}
