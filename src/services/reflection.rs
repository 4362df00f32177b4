//! Meta-reflection: success prediction, impact estimation, learning
//! updates, and remediation selection.
//!
//! Everything here is a pure function of (agent, task, history snapshot) so
//! prediction and scoring stay independently testable; the engine owns all
//! state mutation except [`MetaReflection::learn`], which updates one
//! agent's performance stats in place.

use chrono::Utc;
use std::collections::HashSet;
use tracing::warn;

use crate::domain::models::{Agent, PerformanceStats, RemediationAction, Task, TaskSpec, TaskStatus};
use crate::services::compatibility::CompatibilityScorer;

/// Default domain-average impact used before any history exists.
const DEFAULT_DOMAIN_IMPACT: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct MetaReflection {
    scorer: CompatibilityScorer,
    interference_penalty: f64,
    prediction_floor: f64,
}

impl MetaReflection {
    pub fn new(
        scorer: CompatibilityScorer,
        interference_penalty: f64,
        prediction_floor: f64,
    ) -> Self {
        Self {
            scorer,
            interference_penalty,
            prediction_floor,
        }
    }

    /// Tasks whose domain interferes with `task` and that are currently
    /// processing or already completed.
    pub fn count_interferers(&self, task: &Task, tasks: &[Task]) -> usize {
        if task.interfered_by.is_empty() {
            return 0;
        }
        tasks
            .iter()
            .filter(|t| {
                t.id != task.id
                    && matches!(t.status, TaskStatus::Processing | TaskStatus::Completed)
                    && task.interfered_by.iter().any(|d| d == &t.domain)
            })
            .count()
    }

    /// Probability that `agent` completes `task` successfully.
    ///
    /// Blends the agent's per-domain track record with its skill fit,
    /// weighted by how uncertain the history still is, then discounts for
    /// active interference.
    pub fn predict_success(&self, agent: &Agent, task: &Task, interferers: usize) -> f64 {
        let dp = agent.performance.domain(&task.domain);
        let uncertainty = if dp.uncertainty > 0.0 {
            dp.uncertainty
        } else {
            1.0 / (dp.tasks_completed as f64 + 1.0)
        };

        let skill_fit = self.scorer.skill_fit(agent, task);
        let mut prediction = dp.success_rate * (1.0 - uncertainty) + skill_fit * uncertainty;
        prediction -= self.interference_penalty * interferers as f64;
        prediction.max(self.prediction_floor)
    }

    /// Pick the best idle, compatible agent for `task`, skipping every
    /// agent in `exclude` (normally the task's failed set).
    ///
    /// Returns the arg-max of [`predict_success`](Self::predict_success)
    /// with its prediction, or `None` when no candidate qualifies.
    pub fn evaluate_assignment(
        &self,
        task: &Task,
        agents: &[Agent],
        exclude: &HashSet<String>,
        tasks: &[Task],
    ) -> Option<(String, f64)> {
        let interferers = self.count_interferers(task, tasks);
        if interferers > 0 {
            warn!(
                task_id = %task.id,
                domain = %task.domain,
                interferers,
                "INTERFERENCE_DETECTED: prediction discounted"
            );
        }

        let mut best: Option<(String, f64)> = None;
        for agent in agents {
            if !agent.is_idle() || exclude.contains(&agent.id) {
                continue;
            }
            if self.scorer.score(agent, task).is_none() {
                continue;
            }
            let prediction = self.predict_success(agent, task, interferers);
            if best.as_ref().map_or(true, |(_, p)| prediction > *p) {
                best = Some((agent.id.clone(), prediction));
            }
        }
        best
    }

    /// Estimate the impact of a task before execution.
    ///
    /// Complexity scaled by priority, blended with the completion-weighted
    /// average impact the fleet has seen in this domain.
    pub fn predict_impact(&self, spec: &TaskSpec, agents: &[Agent]) -> f64 {
        let base_impact = f64::from(spec.complexity);
        let priority_multiplier = 1.0 + spec.priority.unwrap_or(1) as f64 / 10.0;

        let mut weighted = 0.0;
        let mut total = 0u64;
        for agent in agents {
            if let Some(dp) = agent.performance.domains.get(&spec.domain) {
                weighted += dp.average_impact * dp.tasks_completed as f64;
                total += dp.tasks_completed;
            }
        }
        let domain_average = if total > 0 {
            weighted / total as f64
        } else {
            DEFAULT_DOMAIN_IMPACT
        };

        0.6 * base_impact * priority_multiplier + 0.4 * domain_average
    }

    /// Fold one execution outcome into an agent's performance stats.
    pub fn learn(&self, stats: &mut PerformanceStats, domain: &str, success: bool, impact: f64) {
        let dp = stats.domains.entry(domain.to_string()).or_default();

        dp.tasks_completed += 1;
        let n = dp.tasks_completed as f64;
        let outcome = if success { 1.0 } else { 0.0 };
        dp.success_rate += (outcome - dp.success_rate) / n;

        if success {
            // Success count recovered from the running mean.
            let successes = (dp.success_rate * n).round().max(1.0);
            dp.average_impact += (impact - dp.average_impact) / successes;
        }

        dp.uncertainty = 1.0 / (n + 1.0);
        dp.confidence = 0.7 * dp.success_rate + 0.3 * (1.0 - dp.uncertainty);

        stats.tasks_completed += 1;
        let total = stats.tasks_completed as f64;
        stats.success_rate += (outcome - stats.success_rate) / total;
        if success {
            let successes = (stats.success_rate * total).round().max(1.0);
            stats.average_impact += (impact - stats.average_impact) / successes;
        }
        stats.last_active = Some(Utc::now());
    }

    /// Choose how to remediate a low-prediction assignment.
    pub fn suggest_remediation(&self, task: &Task, agents: &[Agent]) -> RemediationAction {
        if task.complexity > 6 {
            return RemediationAction::Split;
        }
        let coverage = agents
            .iter()
            .filter(|a| a.covers_domain(&task.domain))
            .count();
        if coverage >= 2 {
            RemediationAction::Collaborate
        } else {
            RemediationAction::Reroute
        }
    }
}

impl Default for MetaReflection {
    fn default() -> Self {
        Self::new(CompatibilityScorer::default(), 0.15, 0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentSpec, DomainPerformance};

    fn agent(id: &str, domain: &str, skill: f64) -> Agent {
        Agent::from_spec(
            id.to_string(),
            AgentSpec::new(&[domain], "mock://a").with_skill(domain, skill),
        )
    }

    fn task(domain: &str, complexity: u8) -> Task {
        Task::from_spec(TaskSpec::new("t", domain, complexity), 1.0)
    }

    #[test]
    fn test_predict_success_fresh_agent_uses_skill_fit() {
        let meta = MetaReflection::default();
        let a = agent("a", "analysis", 8.0);
        let t = task("analysis", 4);

        // No history: uncertainty 1.0, prediction collapses to skill fit.
        assert!((meta.predict_success(&a, &t, 0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_success_weights_history_by_experience() {
        let meta = MetaReflection::default();
        let mut a = agent("a", "analysis", 10.0);
        a.performance.domains.insert(
            "analysis".to_string(),
            DomainPerformance {
                tasks_completed: 9,
                success_rate: 0.4,
                average_impact: 3.0,
                uncertainty: 0.1,
                confidence: 0.55,
            },
        );
        let t = task("analysis", 5);

        // 0.4 * 0.9 + 1.0 * 0.1 = 0.46
        let p = meta.predict_success(&a, &t, 0);
        assert!((p - 0.46).abs() < 1e-9);
    }

    #[test]
    fn test_predict_success_interference_floor() {
        let meta = MetaReflection::default();
        let a = agent("a", "analysis", 10.0);
        let t = task("analysis", 2);

        let p = meta.predict_success(&a, &t, 2);
        assert!((p - 0.7).abs() < 1e-9);

        // Heavy interference bottoms out at the floor.
        let p = meta.predict_success(&a, &t, 10);
        assert!((p - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_count_interferers() {
        let meta = MetaReflection::default();
        let mut t = task("analysis", 3);
        t.interfered_by = vec!["logic".to_string()];

        let mut active = task("logic", 3);
        active.status = TaskStatus::Processing;
        let mut done = task("logic", 3);
        done.status = TaskStatus::Completed;
        let pending = task("logic", 3);
        let other = task("analysis", 3);

        let tasks = vec![t.clone(), active, done, pending, other];
        assert_eq!(meta.count_interferers(&t, &tasks), 2);
    }

    #[test]
    fn test_evaluate_assignment_prefers_better_agent() {
        let meta = MetaReflection::default();
        let strong = agent("strong", "analysis", 9.0);
        let weak = agent("weak", "analysis", 2.0);
        let t = task("analysis", 8);

        let (id, p) = meta
            .evaluate_assignment(&t, &[weak, strong], &HashSet::new(), &[])
            .unwrap();
        assert_eq!(id, "strong");
        assert!(p > 0.9);
    }

    #[test]
    fn test_evaluate_assignment_excludes_failed_and_busy() {
        let meta = MetaReflection::default();
        let mut t = task("analysis", 4);
        t.failed_agents.insert("burned".to_string());

        let burned = agent("burned", "analysis", 9.0);
        let mut busy = agent("busy", "analysis", 9.0);
        busy.status = crate::domain::models::AgentStatus::Busy;

        assert!(meta
            .evaluate_assignment(&t, &[burned, busy], &t.failed_agents, &[])
            .is_none());
    }

    #[test]
    fn test_predict_impact_defaults() {
        let meta = MetaReflection::default();
        let spec = TaskSpec::new("t", "analysis", 5).with_priority(10);

        // 0.6 * 5 * 2.0 + 0.4 * 5.0 = 8.0
        let impact = meta.predict_impact(&spec, &[]);
        assert!((impact - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_impact_weights_fleet_history() {
        let meta = MetaReflection::default();
        let mut a = agent("a", "analysis", 5.0);
        a.performance.domains.insert(
            "analysis".to_string(),
            DomainPerformance {
                tasks_completed: 10,
                average_impact: 8.0,
                ..Default::default()
            },
        );
        let mut b = agent("b", "analysis", 5.0);
        b.performance.domains.insert(
            "analysis".to_string(),
            DomainPerformance {
                tasks_completed: 30,
                average_impact: 4.0,
                ..Default::default()
            },
        );

        let spec = TaskSpec::new("t", "analysis", 5).with_priority(0);
        // dom_avg = (8*10 + 4*30) / 40 = 5.0
        // 0.6 * 5 * 1.0 + 0.4 * 5.0 = 5.0
        let impact = meta.predict_impact(&spec, &[a, b]);
        assert!((impact - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_learn_running_means() {
        let meta = MetaReflection::default();
        let mut stats = PerformanceStats::default();

        meta.learn(&mut stats, "analysis", true, 6.0);
        meta.learn(&mut stats, "analysis", true, 4.0);
        meta.learn(&mut stats, "analysis", false, 0.0);

        let dp = stats.domain("analysis");
        assert_eq!(dp.tasks_completed, 3);
        assert!((dp.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((dp.average_impact - 5.0).abs() < 1e-9);
        assert!((dp.uncertainty - 0.25).abs() < 1e-9);
        assert!((dp.confidence - (0.7 * 2.0 / 3.0 + 0.3 * 0.75)).abs() < 1e-9);

        assert_eq!(stats.tasks_completed, 3);
        assert!(stats.last_active.is_some());
    }

    #[test]
    fn test_suggest_remediation_branches() {
        let meta = MetaReflection::default();
        let a1 = agent("a1", "analysis", 5.0);
        let a2 = agent("a2", "analysis", 5.0);

        // High complexity always splits.
        assert_eq!(
            meta.suggest_remediation(&task("analysis", 9), &[a1.clone()]),
            RemediationAction::Split
        );

        // Enough coverage collaborates.
        assert_eq!(
            meta.suggest_remediation(&task("analysis", 4), &[a1.clone(), a2]),
            RemediationAction::Collaborate
        );

        // Otherwise reroute and wait for the fleet to change.
        assert_eq!(
            meta.suggest_remediation(&task("analysis", 4), &[a1]),
            RemediationAction::Reroute
        );
    }
}
