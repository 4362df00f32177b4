//! Engine - the scheduling loop over one instance's process-wide state.
//!
//! A periodic tick picks one ready task, consults meta-reflection, reserves
//! the agent and resources inside a single critical section, then issues a
//! non-blocking dispatch. Results are applied under the same critical
//! section when they land, so multiple dispatches can be in flight while
//! pick-task + mark-busy + reserve-resources stays atomic.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AgentSpec, DispatchResult, ExecutionRecord, FailureReason, RemediationAction, ResourceMode,
    SuggestedAction, Task, TaskSpec, TaskStatus,
};
use crate::domain::ports::{DispatchError, Dispatcher};
use crate::services::aggregator::{SubtaskAggregator, AGGREGATOR_AGENT_ID};
use crate::services::collaboration::CollaborationBus;
use crate::services::compatibility::CompatibilityScorer;
use crate::services::config::EngineConfig;
use crate::services::dependency_graph::DependencyGraph;
use crate::services::execution_log::ExecutionLog;
use crate::services::reflection::MetaReflection;
use crate::services::registry::AgentRegistry;
use crate::services::resource_arbiter::ResourceArbiter;
use crate::services::task_store::TaskStore;

/// Lifecycle state of the engine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Idle,
    Running,
    Paused,
    ShuttingDown,
    Stopped,
}

/// Events emitted by the engine over the channel handed to [`Engine::run`].
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Started,
    Stopped,
    TaskSubmitted {
        task_id: Uuid,
        domain: String,
    },
    TaskDispatched {
        task_id: Uuid,
        agent_id: String,
        predicted_success: f64,
    },
    TaskCompleted {
        task_id: Uuid,
        agent_id: String,
    },
    TaskFailed {
        task_id: Uuid,
        reason: FailureReason,
    },
    TaskRetrying {
        task_id: Uuid,
        attempt: u32,
        max_attempts: u32,
    },
    TaskSplit {
        parent_id: Uuid,
        subtask_ids: Vec<Uuid>,
    },
    CollaborationSuggested {
        task_id: Uuid,
    },
    CycleDetected {
        task_ids: Vec<Uuid>,
    },
    InterferenceDetected {
        task_id: Uuid,
        domain: String,
        interferers: usize,
    },
    ParentAggregated {
        parent_id: Uuid,
    },
}

/// Point-in-time snapshot of engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub pending_tasks: usize,
    pub processing_tasks: usize,
    pub waiting_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub idle_agents: usize,
    pub busy_agents: usize,
    pub dispatched_total: u64,
    pub records_logged: usize,
}

/// One engine instance. Instances share nothing.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    registry: Arc<AgentRegistry>,
    store: Arc<TaskStore>,
    graph: DependencyGraph,
    arbiter: Arc<ResourceArbiter>,
    reflection: MetaReflection,
    bus: Arc<CollaborationBus>,
    aggregator: SubtaskAggregator,
    log: Arc<ExecutionLog>,
    dispatcher: Arc<dyn Dispatcher>,
    status: Arc<RwLock<EngineStatus>>,
    /// Serializes every mutation of store/registry/arbiter state: ticks and
    /// dispatch-outcome application take this first.
    tick_lock: Arc<Mutex<()>>,
    in_flight: Arc<Mutex<JoinSet<()>>>,
    /// Sender installed by [`run`](Self::run); events emitted before the
    /// loop starts are dropped.
    events: Arc<RwLock<Option<mpsc::Sender<EngineEvent>>>>,
    dispatched_total: Arc<AtomicU64>,
}

impl Engine {
    pub fn new(config: EngineConfig, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let reflection = MetaReflection::new(
            CompatibilityScorer::new(config.scoring.min_compatibility),
            config.scoring.interference_penalty,
            config.scoring.prediction_floor,
        );
        Self {
            registry: Arc::new(AgentRegistry::new(config.valid_domains.clone())),
            store: Arc::new(TaskStore::new(config.valid_domains.clone())),
            graph: DependencyGraph::new(),
            arbiter: Arc::new(ResourceArbiter::new()),
            reflection,
            bus: Arc::new(CollaborationBus::new()),
            aggregator: SubtaskAggregator::new(),
            log: Arc::new(ExecutionLog::new()),
            dispatcher,
            status: Arc::new(RwLock::new(EngineStatus::Idle)),
            tick_lock: Arc::new(Mutex::new(())),
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
            events: Arc::new(RwLock::new(None)),
            dispatched_total: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    // -- State accessors --

    pub fn task_store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn agent_registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn resource_arbiter(&self) -> &Arc<ResourceArbiter> {
        &self.arbiter
    }

    pub fn collaboration_bus(&self) -> &Arc<CollaborationBus> {
        &self.bus
    }

    pub fn execution_log(&self) -> &Arc<ExecutionLog> {
        &self.log
    }

    pub async fn status(&self) -> EngineStatus {
        *self.status.read().await
    }

    /// Emit an event to the channel installed by [`run`](Self::run).
    async fn emit(&self, event: EngineEvent) {
        let events = self.events.read().await;
        if let Some(tx) = events.as_ref() {
            let _ = tx.send(event).await;
        }
    }

    // -- Submission surface --

    /// Register an agent with the engine's registry.
    pub async fn register_agent(&self, spec: AgentSpec) -> DomainResult<String> {
        self.registry.register(spec).await
    }

    /// Register a named resource with the arbiter.
    pub async fn register_resource(
        &self,
        id: impl Into<String>,
        mode: ResourceMode,
        capacity: u32,
    ) {
        self.arbiter.register(id, mode, capacity).await;
    }

    /// Submit a task. Its impact is predicted from current fleet history
    /// before it enters the store.
    pub async fn submit_task(&self, spec: TaskSpec) -> DomainResult<Uuid> {
        let agents = self.registry.list().await;
        let predicted_impact = self.reflection.predict_impact(&spec, &agents);
        let domain = spec.domain.clone();
        let task_id = self.store.submit(spec, predicted_impact).await?;
        self.emit(EngineEvent::TaskSubmitted { task_id, domain }).await;
        Ok(task_id)
    }

    // -- Lifecycle --

    /// Run the scheduling loop until stopped. Tick failures are logged and
    /// never halt the loop.
    pub async fn run(&self, event_tx: mpsc::Sender<EngineEvent>) -> DomainResult<()> {
        {
            let mut events = self.events.write().await;
            *events = Some(event_tx);
        }
        {
            let mut status = self.status.write().await;
            *status = EngineStatus::Running;
        }
        self.emit(EngineEvent::Started).await;
        info!(
            tick_interval_ms = self.config.scheduler.tick_interval_ms,
            "engine started"
        );

        let interval = Duration::from_millis(self.config.scheduler.tick_interval_ms);
        loop {
            let current = self.status().await;
            match current {
                EngineStatus::ShuttingDown | EngineStatus::Stopped => break,
                EngineStatus::Paused => {
                    tokio::time::sleep(interval).await;
                    continue;
                }
                _ => {}
            }

            if let Err(error) = self.tick_with().await {
                warn!(%error, "tick failed");
            }
            tokio::time::sleep(interval).await;
        }

        // In-flight dispatches run to completion; their results are applied
        // if the store still accepts them.
        self.drain_in_flight().await;
        {
            let mut status = self.status.write().await;
            *status = EngineStatus::Stopped;
        }
        let records = self.log.len().await;
        info!(records, "engine stopped; execution log flushed");
        self.emit(EngineEvent::Stopped).await;
        Ok(())
    }

    pub async fn pause(&self) {
        let mut status = self.status.write().await;
        if *status == EngineStatus::Running {
            *status = EngineStatus::Paused;
        }
    }

    pub async fn resume(&self) {
        let mut status = self.status.write().await;
        if *status == EngineStatus::Paused {
            *status = EngineStatus::Running;
        }
    }

    /// Disable new dispatches; the loop exits on its next pass.
    pub async fn stop(&self) {
        let mut status = self.status.write().await;
        if *status != EngineStatus::Stopped {
            *status = EngineStatus::ShuttingDown;
        }
    }

    /// Stop, drain in-flight dispatches, and mark the engine stopped. For
    /// embedders driving [`tick`](Self::tick) directly.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.drain_in_flight().await;
        {
            let mut status = self.status.write().await;
            *status = EngineStatus::Stopped;
        }
        let records = self.log.len().await;
        info!(records, "engine shut down; execution log flushed");
    }

    /// Wait for every in-flight dispatch to finish and be applied.
    ///
    /// The join set is swapped out under the lock and awaited outside it,
    /// so outcome application (which needs the tick lock) can proceed while
    /// we wait. Dispatches spawned after the swap belong to the next drain.
    pub async fn drain_in_flight(&self) {
        let mut draining = {
            let mut in_flight = self.in_flight.lock().await;
            std::mem::take(&mut *in_flight)
        };
        while let Some(result) = draining.join_next().await {
            if let Err(error) = result {
                warn!(%error, "in-flight dispatch task panicked");
            }
        }
    }

    /// Run a single scheduling pass.
    pub async fn tick(&self) -> DomainResult<EngineStats> {
        self.tick_with().await?;
        Ok(self.stats().await)
    }

    pub async fn stats(&self) -> EngineStats {
        let tasks = self.store.list().await;
        let agents = self.registry.list().await;

        let mut stats = EngineStats {
            dispatched_total: self.dispatched_total.load(Ordering::SeqCst),
            records_logged: self.log.len().await,
            ..Default::default()
        };
        for task in &tasks {
            match task.status {
                TaskStatus::Pending => stats.pending_tasks += 1,
                TaskStatus::Processing => stats.processing_tasks += 1,
                TaskStatus::WaitingForSubtasks => stats.waiting_tasks += 1,
                TaskStatus::Completed => stats.completed_tasks += 1,
                TaskStatus::Failed => stats.failed_tasks += 1,
            }
        }
        stats.idle_agents = agents.iter().filter(|a| a.is_idle()).count();
        stats.busy_agents = agents.len() - stats.idle_agents;
        stats
    }

    // -- Tick internals --

    async fn tick_with(&self) -> DomainResult<()> {
        let _guard = self.tick_lock.lock().await;

        self.fail_cycles().await?;
        self.refuse_toxic_tasks().await?;

        let Some(task) = self.store.ready_queue_snapshot().await.into_iter().next() else {
            return Ok(());
        };
        self.schedule_task(task).await
    }

    /// Detect dependency cycles among unfinished tasks and fail every
    /// participant, then cascade to dependents.
    async fn fail_cycles(&self) -> DomainResult<()> {
        let tasks = self.store.list().await;
        let cycles = self.graph.find_cycles(&tasks);
        if cycles.is_empty() {
            return Ok(());
        }

        let mut seeds = HashSet::new();
        for cycle in cycles {
            warn!(members = ?cycle, "dependency cycle detected");
            self.emit(EngineEvent::CycleDetected {
                task_ids: cycle.clone(),
            })
            .await;
            for id in cycle {
                if !seeds.contains(&id) {
                    let failed = self
                        .fail_task(id, FailureReason::CyclicDependencyFailure)
                        .await?;
                    seeds.extend(failed);
                }
            }
        }
        self.cascade_failures(&seeds).await
    }

    /// Refuse tasks that were injected into state behind the store's
    /// validation: fail them instead of dispatching them.
    async fn refuse_toxic_tasks(&self) -> DomainResult<()> {
        let tasks = self.store.list().await;
        let mut seeds = HashSet::new();
        for task in tasks.iter().filter(|t| t.status == TaskStatus::Pending) {
            let invalid = task.validate(&self.config.valid_domains).is_err()
                || !self.graph.dependencies_exist(task, &tasks);
            if invalid {
                warn!(task_id = %task.id, "refusing invalid task found in store");
                let failed = self.fail_task(task.id, FailureReason::InvalidTask).await?;
                seeds.extend(failed);
            }
        }
        if seeds.is_empty() {
            return Ok(());
        }
        self.cascade_failures(&seeds).await
    }

    async fn schedule_task(&self, mut task: Task) -> DomainResult<()> {
        let agents = self.registry.list().await;
        let tasks = self.store.list().await;

        let interferers = self.reflection.count_interferers(&task, &tasks);
        if interferers > 0 {
            self.emit(EngineEvent::InterferenceDetected {
                task_id: task.id,
                domain: task.domain.clone(),
                interferers,
            })
            .await;
        }

        let Some((agent_id, predicted)) =
            self.reflection
                .evaluate_assignment(&task, &agents, &task.failed_agents, &tasks)
        else {
            debug!(task_id = %task.id, "no eligible agent; skipping");
            return Ok(());
        };

        if predicted < self.config.scheduler.remediation_threshold {
            match self.reflection.suggest_remediation(&task, &agents) {
                RemediationAction::Split => return self.split_task(task).await,
                RemediationAction::Collaborate => {
                    task.collaborative = true;
                    task.priority = (task.priority + 2).min(10);
                    task.suggested_action = Some(SuggestedAction::UseCollaborationProtocol);
                    self.store.update(task.clone()).await?;
                    info!(task_id = %task.id, predicted, "collaboration suggested; dispatching");
                    self.emit(EngineEvent::CollaborationSuggested { task_id: task.id })
                        .await;
                }
                RemediationAction::Reroute => {
                    debug!(task_id = %task.id, predicted, "rerouting: waiting for fleet change");
                    return Ok(());
                }
            }
        }

        if !self
            .arbiter
            .try_acquire(task.id, &task.resource_requirements)
            .await
        {
            debug!(task_id = %task.id, "resources unavailable; task stays pending");
            return Ok(());
        }

        let Some(agent) = self.registry.get(&agent_id).await else {
            self.arbiter.release(task.id).await;
            return Err(DomainError::UnknownAgent(agent_id));
        };

        task.assigned_to = Some(agent_id.clone());
        task.predicted_success = Some(predicted);
        task.transition_to(TaskStatus::Processing)?;
        self.store.update(task.clone()).await?;
        self.registry.mark_busy(&agent_id).await?;
        self.dispatched_total.fetch_add(1, Ordering::SeqCst);

        info!(task_id = %task.id, agent_id = %agent_id, predicted, "task dispatched");
        self.emit(EngineEvent::TaskDispatched {
            task_id: task.id,
            agent_id: agent_id.clone(),
            predicted_success: predicted,
        })
        .await;

        let engine = self.clone();
        let mut in_flight = self.in_flight.lock().await;
        let _abort = in_flight.spawn(async move {
            let outcome = engine.dispatcher.dispatch(&agent, &task).await;
            if let Err(error) = engine
                .apply_dispatch_outcome(task.id, &agent.id, outcome)
                .await
            {
                warn!(task_id = %task.id, %error, "failed to apply dispatch outcome");
            }
        });
        Ok(())
    }

    /// Decompose a task into two half-complexity sub-tasks.
    async fn split_task(&self, mut parent: Task) -> DomainResult<()> {
        let agents = self.registry.list().await;

        parent.transition_to(TaskStatus::WaitingForSubtasks)?;
        self.store.update(parent.clone()).await?;

        let halves = [
            ((parent.complexity + 1) / 2, (parent.priority + 1).min(10)),
            ((parent.complexity / 2).max(1), parent.priority),
        ];

        let mut subtask_ids = Vec::new();
        for (index, (complexity, priority)) in halves.into_iter().enumerate() {
            let mut spec = TaskSpec::new(
                format!("{} (part {}/2)", parent.description, index + 1),
                parent.domain.clone(),
                complexity,
            )
            .with_priority(priority);
            spec.interfered_by = parent.interfered_by.clone();
            spec.resource_requirements = parent.resource_requirements.clone();

            let predicted_impact = self.reflection.predict_impact(&spec, &agents);
            let child_id = self
                .store
                .inject_subtask(parent.id, spec, predicted_impact)
                .await?;
            subtask_ids.push(child_id);
        }

        info!(parent_id = %parent.id, ?subtask_ids, "task split into sub-tasks");
        self.emit(EngineEvent::TaskSplit {
            parent_id: parent.id,
            subtask_ids,
        })
        .await;
        Ok(())
    }

    // -- Dispatch outcome handling --

    async fn apply_dispatch_outcome(
        &self,
        task_id: Uuid,
        agent_id: &str,
        outcome: Result<serde_json::Value, DispatchError>,
    ) -> DomainResult<()> {
        let _guard = self.tick_lock.lock().await;

        let Some(task) = self.store.get(task_id).await else {
            return Ok(());
        };
        if task.status != TaskStatus::Processing || task.assigned_to.as_deref() != Some(agent_id)
        {
            debug!(task_id = %task_id, agent_id, "stale dispatch result dropped");
            if self.store.processing_task_for_agent(agent_id).await.is_none() {
                let _ = self.registry.mark_idle(agent_id).await;
            }
            return Ok(());
        }

        match outcome {
            Err(error) => {
                self.handle_failed_attempt(
                    task,
                    agent_id,
                    FailureReason::MaxRetriesExhausted,
                    error.to_string(),
                )
                .await
            }
            Ok(payload) => match DispatchResult::from_payload(&payload) {
                Err(defect) => {
                    self.handle_failed_attempt(
                        task,
                        agent_id,
                        FailureReason::MalformedDispatchResult,
                        defect,
                    )
                    .await
                }
                Ok(result)
                    if result.confidence_score
                        < self.config.scheduler.low_confidence_threshold =>
                {
                    let detail = format!(
                        "confidence {} below {}",
                        result.confidence_score, self.config.scheduler.low_confidence_threshold
                    );
                    self.handle_failed_attempt(
                        task,
                        agent_id,
                        FailureReason::LowConfidenceAbort,
                        detail,
                    )
                    .await
                }
                Ok(result) => self.commit_result(task, agent_id, result).await,
            },
        }
    }

    /// One attempt failed: release the agent, learn from the failure, and
    /// either requeue the task or fail it terminally with `terminal_reason`.
    async fn handle_failed_attempt(
        &self,
        mut task: Task,
        agent_id: &str,
        terminal_reason: FailureReason,
        detail: String,
    ) -> DomainResult<()> {
        self.arbiter.release(task.id).await;
        self.registry.mark_idle(agent_id).await?;

        task.failed_agents.insert(agent_id.to_string());
        task.retry_count += 1;

        // Learning happens on both the retry and the terminal branch.
        let domain = task.domain.clone();
        self.registry
            .update(agent_id, |agent| {
                self.reflection.learn(&mut agent.performance, &domain, false, 0.0);
            })
            .await?;

        let max_attempts = self.config.scheduler.max_retries;
        warn!(
            task_id = %task.id,
            agent_id,
            attempt = task.retry_count,
            max_attempts,
            detail = %detail,
            "dispatch attempt failed"
        );

        if task.retry_count < max_attempts {
            task.assigned_to = None;
            task.predicted_success = None;
            task.transition_to(TaskStatus::Pending)?;
            self.store.update(task.clone()).await?;
            self.emit(EngineEvent::TaskRetrying {
                task_id: task.id,
                attempt: task.retry_count,
                max_attempts,
            })
            .await;
            Ok(())
        } else {
            // Keep the last agent on the record for the terminal entry.
            self.store.update(task.clone()).await?;
            let failed = self.fail_task(task.id, terminal_reason).await?;
            let seeds: HashSet<Uuid> = failed.into_iter().collect();
            self.cascade_failures(&seeds).await
        }
    }

    /// Commit a validated, confident result.
    async fn commit_result(
        &self,
        mut task: Task,
        agent_id: &str,
        result: DispatchResult,
    ) -> DomainResult<()> {
        self.arbiter.release(task.id).await;
        self.registry.mark_idle(agent_id).await?;

        let output = result.into_output();
        let actual_impact = output.actual_impact;
        task.output = Some(output);
        task.transition_to(TaskStatus::Completed)?;
        self.store.update(task.clone()).await?;

        let domain = task.domain.clone();
        self.registry
            .update(agent_id, |agent| {
                self.reflection
                    .learn(&mut agent.performance, &domain, true, actual_impact);
            })
            .await?;

        self.log.append(ExecutionRecord::from_task(&task)).await;
        info!(task_id = %task.id, agent_id, actual_impact, "task completed");
        self.emit(EngineEvent::TaskCompleted {
            task_id: task.id,
            agent_id: agent_id.to_string(),
        })
        .await;

        // Collaborative tasks publish their result onto the blackboard for
        // the rest of their context.
        if task.collaborative {
            let context = task.parent_id.unwrap_or(task.id);
            if let Some(output) = &task.output {
                self.bus
                    .share(context, task.id, agent_id, output.result_data.clone())
                    .await;
            }
        }

        if let Some(parent_id) = task.parent_id {
            let completed = self
                .aggregator
                .on_child_completed(parent_id, &self.store, &self.bus)
                .await?;
            for pid in completed {
                if let Some(parent) = self.store.get(pid).await {
                    self.log.append(ExecutionRecord::from_task(&parent)).await;
                }
                self.emit(EngineEvent::ParentAggregated { parent_id: pid })
                    .await;
            }
        }
        Ok(())
    }

    // -- Failure plumbing --

    /// Fail one task and everything structurally doomed with it: orphaned
    /// descendant sub-tasks and ancestors that can no longer aggregate.
    /// Returns every id newly failed.
    async fn fail_task(&self, id: Uuid, reason: FailureReason) -> DomainResult<Vec<Uuid>> {
        let mut all_failed = Vec::new();
        if !self.fail_single(id, reason).await? {
            return Ok(all_failed);
        }
        all_failed.push(id);

        // Ancestors: a failed child means the parent can never aggregate.
        let parent_chain = match self.store.get(id).await.and_then(|t| t.parent_id) {
            Some(parent_id) => {
                self.aggregator
                    .on_child_failed(parent_id, &self.store)
                    .await?
            }
            None => Vec::new(),
        };
        for pid in &parent_chain {
            if let Some(parent) = self.store.get(*pid).await {
                self.log.append(ExecutionRecord::from_task(&parent)).await;
            }
            self.emit(EngineEvent::TaskFailed {
                task_id: *pid,
                reason: FailureReason::DependencyFailureCascade,
            })
            .await;
        }
        all_failed.extend(parent_chain.iter().copied());

        // Descendants of everything that just failed are orphaned.
        let mut queue = VecDeque::new();
        for fid in std::iter::once(&id).chain(parent_chain.iter()) {
            if let Some(failed_task) = self.store.get(*fid).await {
                queue.extend(failed_task.subtasks.iter().copied());
            }
        }
        while let Some(child_id) = queue.pop_front() {
            if let Some(child) = self.store.get(child_id).await {
                queue.extend(child.subtasks.iter().copied());
                if self
                    .fail_single(child_id, FailureReason::DependencyFailureCascade)
                    .await?
                {
                    all_failed.push(child_id);
                }
            }
        }

        Ok(all_failed)
    }

    /// Fail exactly one task. Returns false when it was already terminal
    /// or unknown.
    async fn fail_single(&self, id: Uuid, reason: FailureReason) -> DomainResult<bool> {
        let Some(mut task) = self.store.get(id).await else {
            return Ok(false);
        };
        if task.is_terminal() {
            return Ok(false);
        }

        self.arbiter.release(id).await;
        if let Some(agent_id) = task.assigned_to.clone() {
            if agent_id != AGGREGATOR_AGENT_ID {
                let _ = self.registry.mark_idle(&agent_id).await;
            }
        }

        task.failure_reason = Some(reason);
        task.transition_to(TaskStatus::Failed)?;
        self.store.update(task.clone()).await?;
        self.log.append(ExecutionRecord::from_task(&task)).await;
        warn!(task_id = %id, %reason, "task failed");
        self.emit(EngineEvent::TaskFailed {
            task_id: id,
            reason,
        })
        .await;
        Ok(true)
    }

    /// Fail every pending task whose dependency closure intersects the
    /// failed set, iterating until no new failures appear.
    async fn cascade_failures(&self, seeds: &HashSet<Uuid>) -> DomainResult<()> {
        let mut frontier = seeds.clone();
        while !frontier.is_empty() {
            let tasks = self.store.list().await;
            let targets = self.graph.cascade_targets(&frontier, &tasks);
            frontier.clear();
            for id in targets {
                let failed = self
                    .fail_task(id, FailureReason::DependencyFailureCascade)
                    .await?;
                frontier.extend(failed);
            }
        }
        Ok(())
    }
}
