//! Compatibility scoring between an agent and a task.
//!
//! Weighted blend: 40% domain coverage, 30% skill-vs-complexity fit,
//! 20% global success rate, 10% reliability buffer.

use crate::domain::models::{Agent, Task};

/// Pure scoring functions over (agent, task) pairs.
#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    /// Candidates scoring below this are rejected outright.
    min_score: f64,
}

impl CompatibilityScorer {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }

    /// How well the agent's skill covers the task's complexity, in [0, 1].
    ///
    /// Agents without an explicit score for the task's domain fall back to
    /// 70% of their mean skill. At or above the required level the fit is
    /// perfect; below it the fit degrades proportionally.
    pub fn skill_fit(&self, agent: &Agent, task: &Task) -> f64 {
        let skill = match agent.skill_scores.get(&task.domain) {
            Some(s) => *s,
            None => {
                if agent.skill_scores.is_empty() {
                    0.0
                } else {
                    let mean: f64 = agent.skill_scores.values().sum::<f64>()
                        / agent.skill_scores.len() as f64;
                    0.7 * mean
                }
            }
        };

        let normalized_skill = skill / 10.0;
        let normalized_complexity = f64::from(task.complexity) / 10.0;
        if normalized_skill >= normalized_complexity {
            1.0
        } else {
            normalized_skill / normalized_complexity
        }
    }

    /// Scalar compatibility in [0, 1], or `None` when the agent is rejected.
    pub fn score(&self, agent: &Agent, task: &Task) -> Option<f64> {
        let domain_component = if agent.covers_domain(&task.domain) {
            1.0
        } else {
            0.0
        };

        let skill_component = self.skill_fit(agent, task);

        let success_component = if agent.performance.tasks_completed == 0 {
            0.5
        } else {
            agent.performance.success_rate
        };

        let experience = (agent.performance.tasks_completed as f64 / 50.0).min(1.0);
        let priority_weight = (task.priority as f64 / 10.0).clamp(0.0, 1.0);
        let reliability = 0.5 * experience + 0.5 * priority_weight;

        let score = 0.4 * domain_component
            + 0.3 * skill_component
            + 0.2 * success_component
            + 0.1 * reliability;

        (score >= self.min_score).then_some(score)
    }
}

impl Default for CompatibilityScorer {
    fn default() -> Self {
        Self::new(0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentSpec, TaskSpec};

    fn agent(domains: &[&str], skill: Option<(&str, f64)>) -> Agent {
        let mut spec = AgentSpec::new(domains, "mock://a");
        if let Some((d, s)) = skill {
            spec = spec.with_skill(d, s);
        }
        Agent::from_spec("a".to_string(), spec)
    }

    fn task(domain: &str, complexity: u8, priority: i64) -> Task {
        Task::from_spec(
            TaskSpec::new("t", domain, complexity).with_priority(priority),
            1.0,
        )
    }

    #[test]
    fn test_skill_fit_at_or_above_complexity() {
        let scorer = CompatibilityScorer::default();
        let a = agent(&["analysis"], Some(("analysis", 8.0)));
        assert_eq!(scorer.skill_fit(&a, &task("analysis", 8, 1)), 1.0);
        assert_eq!(scorer.skill_fit(&a, &task("analysis", 5, 1)), 1.0);
    }

    #[test]
    fn test_skill_fit_shortfall_is_proportional() {
        let scorer = CompatibilityScorer::default();
        let a = agent(&["analysis"], Some(("analysis", 4.0)));
        let fit = scorer.skill_fit(&a, &task("analysis", 8, 1));
        assert!((fit - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_skill_fit_falls_back_to_discounted_mean() {
        let scorer = CompatibilityScorer::default();
        let mut a = agent(&["analysis"], None);
        a.skill_scores.insert("logic".to_string(), 10.0);

        // 0.7 * 10 = 7 effective skill against complexity 7.
        let fit = scorer.skill_fit(&a, &task("analysis", 7, 1));
        assert!((fit - 1.0).abs() < 1e-9);

        let fit = scorer.skill_fit(&a, &task("analysis", 10, 1));
        assert!((fit - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_score_fresh_agent_in_domain() {
        let scorer = CompatibilityScorer::default();
        let a = agent(&["analysis"], Some(("analysis", 10.0)));
        let t = task("analysis", 5, 10);

        // 0.4 + 0.3 + 0.2*0.5 + 0.1*(0.5*0 + 0.5*1.0) = 0.85
        let score = scorer.score(&a, &t).unwrap();
        assert!((score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_score_rejects_below_floor() {
        let scorer = CompatibilityScorer::default();
        // Off-domain, zero skill, no history, priority 0:
        // 0.0 + 0.0 + 0.1 + 0.0 = 0.1 < 0.2.
        let a = agent(&["logic"], None);
        let t = task("analysis", 5, 0);
        assert!(scorer.score(&a, &t).is_none());
    }

    #[test]
    fn test_score_uses_recorded_success_rate() {
        let scorer = CompatibilityScorer::default();
        let mut a = agent(&["analysis"], Some(("analysis", 10.0)));
        a.performance.tasks_completed = 50;
        a.performance.success_rate = 1.0;

        let t = task("analysis", 5, 10);
        // 0.4 + 0.3 + 0.2 + 0.1*(0.5 + 0.5) = 1.0
        let score = scorer.score(&a, &t).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }
}
