use crate::agents::automation::ProcessAutomatorAgent;
use crate::agents::decision::DecisionMakerAgent;
use crate::agents::healing::SelfHealerAgent;
use crate::agents::{AgentHandler, AgentOutcome, AgentRegistry};
use crate::config::OrchestratorConfig;
use crate::executor::{StepExecutor, StrategyExecutor};
use crate::monitor::{SystemMonitor, TaskCounters};
use crate::task_queue::TaskQueue;
use crate::telemetry::TelemetrySource;
use crate::types::{AgentType, SystemState, Task, TaskPriority, TaskStatus};
use overseer_core::{OverseerError, OverseerResult, Params};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Tasks that have left the queue, plus lifetime counters.
#[derive(Default)]
struct TaskLedger {
    tasks: HashMap<Uuid, Task>,
    completed: u64,
    failed: u64,
}

impl TaskLedger {
    fn track(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    /// Store a task that has reached a terminal status.
    fn finish(&mut self, task: Task) {
        match task.status() {
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
            _ => {}
        }
        self.tasks.insert(task.id, task);
    }

    fn counters(&self) -> TaskCounters {
        TaskCounters {
            active: self
                .tasks
                .values()
                .filter(|t| t.status() == TaskStatus::InProgress)
                .count(),
            completed: self.completed,
            failed: self.failed,
        }
    }
}

/// Overall health report served by the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"healthy"` or `"degraded"`, judged against the health threshold.
    pub status: String,
    /// `"active"` for agent types with a handler, `"unavailable"` otherwise.
    pub agents: BTreeMap<String, String>,
    pub queued_tasks: usize,
    pub system_state: SystemState,
}

/// Join handles for the two background loops started by [`Orchestrator::start`].
pub struct LoopHandles {
    pub monitor: JoinHandle<()>,
    pub processor: JoinHandle<()>,
}

impl LoopHandles {
    /// Wait for both loops to exit.
    pub async fn join(self) {
        if let Err(e) = self.monitor.await {
            error!(error = %e, "Monitoring loop panicked");
        }
        if let Err(e) = self.processor.await {
            error!(error = %e, "Processing loop panicked");
        }
    }
}

/// Owns the task queue, system state and agents, and drives the monitoring
/// and processing loops.
///
/// Lock order is queue before ledger. A task is always visible in exactly
/// one of the two, so cancellation never misses a task in transit.
pub struct Orchestrator {
    config: OrchestratorConfig,
    queue: Arc<Mutex<TaskQueue>>,
    ledger: Arc<RwLock<TaskLedger>>,
    monitor: Arc<SystemMonitor>,
    agents: parking_lot::RwLock<AgentRegistry>,
    decision_maker: Arc<DecisionMakerAgent>,
    automator: Arc<ProcessAutomatorAgent>,
    healer: Arc<SelfHealerAgent>,
    telemetry: Arc<dyn TelemetrySource>,
    running: parking_lot::Mutex<HashMap<Uuid, CancellationToken>>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Build an orchestrator with the three built-in agents registered.
    pub fn new(
        config: OrchestratorConfig,
        steps: Arc<dyn StepExecutor>,
        strategies: Arc<dyn StrategyExecutor>,
        telemetry: Arc<dyn TelemetrySource>,
    ) -> OverseerResult<Self> {
        config.validate()?;

        let decision_maker = Arc::new(DecisionMakerAgent::new(config.decision_history_capacity));
        let automator = Arc::new(ProcessAutomatorAgent::new(steps));
        let healer = Arc::new(SelfHealerAgent::new(strategies));

        let mut agents = AgentRegistry::new();
        agents.register(AgentType::DecisionMaker, decision_maker.clone());
        agents.register(AgentType::ProcessAutomator, automator.clone());
        agents.register(AgentType::SelfHealer, healer.clone());

        Ok(Self {
            queue: Arc::new(Mutex::new(TaskQueue::new(config.queue_capacity))),
            ledger: Arc::new(RwLock::new(TaskLedger::default())),
            monitor: Arc::new(SystemMonitor::new(&config)),
            agents: parking_lot::RwLock::new(agents),
            decision_maker,
            automator,
            healer,
            telemetry,
            running: parking_lot::Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            config,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn decision_maker(&self) -> &Arc<DecisionMakerAgent> {
        &self.decision_maker
    }

    pub fn automator(&self) -> &Arc<ProcessAutomatorAgent> {
        &self.automator
    }

    pub fn healer(&self) -> &Arc<SelfHealerAgent> {
        &self.healer
    }

    pub fn monitor(&self) -> &Arc<SystemMonitor> {
        &self.monitor
    }

    /// Add or replace the handler for `agent_type`. Tasks already dispatched
    /// keep the handler they started with.
    pub fn register_agent(&self, agent_type: AgentType, handler: Arc<dyn AgentHandler>) {
        info!(agent_type = %agent_type, "Registering agent handler");
        self.agents.write().register(agent_type, handler);
    }

    /// Queue a pending task. Fails with `QueueFull` at capacity.
    pub async fn submit_task(&self, task: Task) -> OverseerResult<Uuid> {
        let (agent_type, priority) = (task.agent_type, task.priority());
        let id = self.queue.lock().await.enqueue(task)?;
        info!(task_id = %id, agent_type = %agent_type, priority = %priority, "Task submitted");
        Ok(id)
    }

    /// Queued tasks followed by dispatched ones, oldest first.
    pub async fn list_tasks(&self) -> Vec<Task> {
        let mut tasks = self.queue.lock().await.snapshot();
        tasks.extend(self.ledger.read().await.tasks.values().cloned());
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Look up a single task, queued or dispatched.
    pub async fn task(&self, id: Uuid) -> Option<Task> {
        let queued = self
            .queue
            .lock()
            .await
            .snapshot()
            .into_iter()
            .find(|t| t.id == id);
        match queued {
            Some(task) => Some(task),
            None => self.ledger.read().await.tasks.get(&id).cloned(),
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn system_state(&self) -> SystemState {
        self.monitor.snapshot().await
    }

    pub async fn health_status(&self) -> HealthStatus {
        let system_state = self.monitor.snapshot().await;
        let status = if system_state.health_score >= self.config.health_threshold {
            "healthy"
        } else {
            "degraded"
        };
        let agents = {
            let registry = self.agents.read();
            AgentType::ALL
                .into_iter()
                .map(|t| {
                    let state = if registry.is_registered(t) {
                        "active"
                    } else {
                        "unavailable"
                    };
                    (t.to_string(), state.to_string())
                })
                .collect()
        };
        HealthStatus {
            status: status.to_string(),
            agents,
            queued_tasks: self.queue_len().await,
            system_state,
        }
    }

    /// Cancel a queued or running task.
    ///
    /// A queued task is failed immediately with error `"cancelled"`. A
    /// running task has its token cancelled and fails once its agent
    /// returns. Terminal tasks are rejected with `InvalidTransition`.
    pub async fn cancel_task(&self, id: Uuid) -> OverseerResult<Task> {
        let mut queue = self.queue.lock().await;

        if let Some(mut task) = queue.remove(id) {
            drop(queue);
            task.start()?;
            task.fail("cancelled", None)?;
            info!(task_id = %id, "Cancelled queued task");
            self.ledger.write().await.finish(task.clone());
            return Ok(task);
        }

        // The token is read under the ledger lock, and process_next drops
        // it under the same lock once the task is finished.
        let ledger = self.ledger.read().await;
        drop(queue);
        let task = ledger
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| OverseerError::NotFound(format!("task {id}")))?;
        let token = self.running.lock().get(&id).cloned();

        match token {
            Some(token) if !task.is_terminal() => {
                token.cancel();
                info!(task_id = %id, "Cancellation requested for running task");
                Ok(task)
            }
            _ => Err(OverseerError::InvalidTransition {
                task_id: id,
                from: task.status().to_string(),
                to: TaskStatus::Failed.to_string(),
            }),
        }
    }

    /// One monitoring pass: refresh state from telemetry and enqueue a task
    /// for every issue and optimization found. Returns the enqueued ids.
    pub async fn monitor_cycle(&self) -> OverseerResult<Vec<Uuid>> {
        let sample = self.telemetry.sample().await?;
        let counters = self.ledger.read().await.counters();
        let state = self.monitor.refresh(sample, counters).await;

        let mut raised = Vec::new();
        for issue in self.monitor.detect_issues(&state) {
            warn!(
                issue_type = %issue.issue_type,
                health_score = state.health_score,
                system_load = state.system_load,
                "System issue detected"
            );
            let mut params = Params::new();
            params.insert("issue".to_string(), issue.to_params().into());
            let task = Task::new(
                AgentType::SelfHealer,
                TaskPriority::High,
                format!("Heal issue: {}", issue.issue_type),
            )
            .with_parameters(params);
            match self.submit_task(task).await {
                Ok(id) => raised.push(id),
                Err(e) => error!(error = %e, "Failed to queue healing task"),
            }
        }

        for optimization in self.monitor.detect_optimizations(&state) {
            if self.optimization_outstanding(&optimization.optimization_type).await {
                debug!(
                    optimization_type = %optimization.optimization_type,
                    "Optimization already queued, not raising again"
                );
                continue;
            }
            let mut params = Params::new();
            params.insert("optimization".to_string(), optimization.to_params().into());
            let task = Task::new(
                AgentType::Optimizer,
                TaskPriority::Medium,
                optimization.description.clone(),
            )
            .with_parameters(params);
            match self.submit_task(task).await {
                Ok(id) => raised.push(id),
                Err(e) => error!(error = %e, "Failed to queue optimization task"),
            }
        }

        Ok(raised)
    }

    /// Whether an optimizer task of this type is still queued or running.
    async fn optimization_outstanding(&self, optimization_type: &str) -> bool {
        let is_match = |task: &Task| {
            task.agent_type == AgentType::Optimizer
                && !task.is_terminal()
                && task
                    .parameters
                    .get("optimization")
                    .and_then(|o| o.get("type"))
                    .and_then(|t| t.as_str())
                    == Some(optimization_type)
        };
        let queue = self.queue.lock().await;
        if queue.snapshot().iter().any(is_match) {
            return true;
        }
        let ledger = self.ledger.read().await;
        drop(queue);
        ledger.tasks.values().any(is_match)
    }

    /// Dispatch the highest-priority queued task, if any, and wait for it to
    /// reach a terminal status.
    pub async fn process_next(&self) -> OverseerResult<Option<Task>> {
        let (mut task, token) = {
            let mut queue = self.queue.lock().await;
            let Some(mut task) = queue.dequeue() else {
                return Ok(None);
            };
            task.start()?;
            let token = self.shutdown.child_token();
            self.running.lock().insert(task.id, token.clone());
            self.ledger.write().await.track(task.clone());
            (task, token)
        };

        info!(task_id = %task.id, agent_type = %task.agent_type, "Dispatching task");

        let handler = self.agents.read().get(task.agent_type);
        let outcome = match handler {
            Ok(handler) => handler.handle(&task, &token).await,
            Err(e) => Err(e),
        };
        let cancelled = token.is_cancelled();

        match outcome {
            Ok(AgentOutcome::Completed(result)) if !cancelled => {
                task.complete(result)?;
                info!(task_id = %task.id, "Task completed");
            }
            Ok(AgentOutcome::Completed(result)) => {
                let reason = OverseerError::Cancelled(task.id.to_string()).to_string();
                task.fail(reason, Some(result))?;
                warn!(task_id = %task.id, "Task cancelled");
            }
            Ok(AgentOutcome::Failed { error, partial }) => {
                warn!(task_id = %task.id, error = %error, "Task failed");
                task.fail(error, Some(partial))?;
            }
            Err(e) => {
                error!(task_id = %task.id, error = %e, "Task failed");
                task.fail(e.to_string(), None)?;
            }
        }

        {
            let mut ledger = self.ledger.write().await;
            ledger.finish(task.clone());
            self.running.lock().remove(&task.id);
        }
        Ok(Some(task))
    }

    /// Spawn the monitoring and processing loops. Both stop on
    /// [`Orchestrator::shutdown`]; an error in one tick is logged and the
    /// loop carries on.
    pub fn start(self: &Arc<Self>) -> LoopHandles {
        info!(
            monitor_interval_secs = self.config.monitor_interval_secs,
            process_interval_secs = self.config.process_interval_secs,
            "Starting orchestrator loops"
        );

        let this = Arc::clone(self);
        let monitor = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.monitor_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = this.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = this.monitor_cycle().await {
                            error!(error = %e, "Monitoring cycle failed");
                        }
                    }
                }
            }
            info!("Monitoring loop stopped");
        });

        let this = Arc::clone(self);
        let processor = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.process_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = this.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = this.process_next().await {
                            error!(error = %e, "Processing cycle failed");
                        }
                    }
                }
            }
            info!("Processing loop stopped");
        });

        LoopHandles { monitor, processor }
    }

    /// Stop both loops and cancel every running task.
    pub fn shutdown(&self) {
        info!("Orchestrator shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
