#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use overseer_core::{OverseerError, OverseerResult, Params};
use overseer_orchestrator::{
    AgentType, Diagnosis, HealingStrategy, IssueType, Orchestrator, OrchestratorConfig,
    ProcessStep, SelfHealerAgent, StepExecutor, StrategyExecutor, Task, TaskPriority,
    TaskStatus, TelemetrySample, TelemetrySource,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Records every action it is asked to run and fails the ones listed.
#[derive(Default)]
struct Recorder {
    failing: Vec<&'static str>,
    hang_on: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn failing(actions: &[&'static str]) -> Self {
        Self {
            failing: actions.to_vec(),
            ..Default::default()
        }
    }

    fn hanging(action: &'static str) -> Self {
        Self {
            hang_on: Some(action),
            ..Default::default()
        }
    }

    async fn run(&self, action: &str) -> OverseerResult<Value> {
        self.calls.lock().push(action.to_string());
        if self.hang_on == Some(action) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&action) {
            return Err(OverseerError::StepExecution {
                step: action.to_string(),
                reason: "disk full".to_string(),
            });
        }
        Ok(json!({ "action": action }))
    }
}

#[async_trait]
impl StepExecutor for Recorder {
    async fn execute_step(&self, step: &ProcessStep, _parameters: &Params) -> OverseerResult<Value> {
        self.run(&step.action).await
    }
}

#[async_trait]
impl StrategyExecutor for Recorder {
    async fn execute_strategy(
        &self,
        strategy: &HealingStrategy,
        _diagnosis: &Diagnosis,
    ) -> OverseerResult<Value> {
        self.run(&strategy.action).await
    }
}

struct Steady {
    health: f64,
    load: f64,
}

#[async_trait]
impl TelemetrySource for Steady {
    async fn sample(&self) -> OverseerResult<TelemetrySample> {
        Ok(TelemetrySample {
            health_score: self.health,
            system_load: self.load,
            ..Default::default()
        })
    }
}

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap()
}

fn build(executor: Arc<Recorder>, config: OrchestratorConfig) -> Arc<Orchestrator> {
    Arc::new(
        Orchestrator::new(
            config,
            executor.clone(),
            executor,
            Arc::new(Steady {
                health: 1.0,
                load: 0.1,
            }),
        )
        .unwrap(),
    )
}

fn decision(priority: TaskPriority, description: &str) -> Task {
    Task::new(AgentType::DecisionMaker, priority, description)
        .with_parameters(params(json!({"resource_constraint": "cpu"})))
}

#[tokio::test]
async fn test_dispatch_order_follows_priority_then_submission() {
    let orch = build(Arc::new(Recorder::default()), OrchestratorConfig::default());

    orch.submit_task(decision(TaskPriority::Low, "low")).await.unwrap();
    orch.submit_task(decision(TaskPriority::Critical, "critical")).await.unwrap();
    orch.submit_task(decision(TaskPriority::Medium, "medium-1")).await.unwrap();
    orch.submit_task(decision(TaskPriority::Medium, "medium-2")).await.unwrap();

    let mut order = Vec::new();
    while let Some(task) = orch.process_next().await.unwrap() {
        order.push(task.description);
    }
    assert_eq!(order, vec!["critical", "medium-1", "medium-2", "low"]);
}

#[tokio::test]
async fn test_late_critical_task_preempts_queued_work() {
    let orch = build(Arc::new(Recorder::default()), OrchestratorConfig::default());

    orch.submit_task(decision(TaskPriority::Low, "first")).await.unwrap();
    orch.submit_task(decision(TaskPriority::High, "second")).await.unwrap();
    assert_eq!(orch.process_next().await.unwrap().unwrap().description, "second");

    orch.submit_task(decision(TaskPriority::Critical, "urgent")).await.unwrap();
    assert_eq!(orch.process_next().await.unwrap().unwrap().description, "urgent");
    assert_eq!(orch.process_next().await.unwrap().unwrap().description, "first");
}

#[tokio::test]
async fn test_queue_full_is_rejected() {
    let config = OrchestratorConfig {
        queue_capacity: 1,
        ..Default::default()
    };
    let orch = build(Arc::new(Recorder::default()), config);

    orch.submit_task(decision(TaskPriority::Low, "a")).await.unwrap();
    let err = orch
        .submit_task(decision(TaskPriority::Critical, "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, OverseerError::QueueFull { capacity: 1 }));
    assert_eq!(orch.queue_len().await, 1);
}

#[tokio::test]
async fn test_backup_failure_keeps_partial_progress() {
    let recorder = Arc::new(Recorder::failing(&["create_backup"]));
    let orch = build(recorder.clone(), OrchestratorConfig::default());

    let task = Task::new(AgentType::ProcessAutomator, TaskPriority::High, "nightly backup")
        .with_parameters(params(json!({"process_type": "backup"})));
    orch.submit_task(task).await.unwrap();

    let task = orch.process_next().await.unwrap().unwrap();
    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(task.error_message().unwrap().starts_with("Step 'create_backup' failed"));

    let outcome = task.result().unwrap();
    assert_eq!(outcome["completed_steps"], 2);
    assert_eq!(outcome["total_steps"], 4);
    assert_eq!(*recorder.calls.lock(), vec!["prepare_backup", "create_backup"]);
}

#[tokio::test]
async fn test_unknown_process_type_leaves_queue_untouched() {
    let orch = build(Arc::new(Recorder::default()), OrchestratorConfig::default());
    orch.submit_task(decision(TaskPriority::Low, "queued")).await.unwrap();

    let err = orch
        .automator()
        .execute_automation("migration", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OverseerError::UnknownTemplate(ref t) if t == "migration"));
    assert_eq!(orch.queue_len().await, 1);
}

#[tokio::test]
async fn test_timeout_symptom_runs_analyze_performance_first() {
    let recorder = Arc::new(Recorder::default());
    let healer = SelfHealerAgent::new(recorder.clone());

    let report = healer
        .diagnose_and_heal(&params(json!({"id": "inc-7", "symptoms": ["timeout", "slow"]})))
        .await
        .unwrap();

    assert_eq!(report.diagnosis.issue_type, IssueType::PerformanceDegradation);
    assert!(report.success());
    assert_eq!(recorder.calls.lock()[0], "analyze_performance");
}

#[tokio::test]
async fn test_out_of_memory_diagnosis() {
    let diagnosis = SelfHealerAgent::diagnose(&params(json!({"symptoms": "out_of_memory"})));
    assert_eq!(diagnosis.issue_type, IssueType::ResourceExhaustion);
    assert_eq!(diagnosis.confidence, 0.95);
}

#[tokio::test]
async fn test_performance_decision_with_urgency() {
    let orch = build(Arc::new(Recorder::default()), OrchestratorConfig::default());
    let decision = orch
        .decision_maker()
        .make_decision(&params(json!({"performance_issue": true, "urgency": 2.0})))
        .unwrap();

    assert_eq!(decision.selected_option.action, "investigate_root_cause");
    assert!((decision.score - 5.2).abs() < 1e-9);
    assert!((0.0..=1.0).contains(&decision.confidence));
}

#[tokio::test]
async fn test_cancel_running_task() {
    let recorder = Arc::new(Recorder::hanging("prepare_backup"));
    let orch = build(recorder, OrchestratorConfig::default());

    let task = Task::new(AgentType::ProcessAutomator, TaskPriority::High, "backup")
        .with_parameters(params(json!({"process_type": "backup"})));
    let id = orch.submit_task(task).await.unwrap();

    let worker = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.process_next().await })
    };

    for _ in 0..200 {
        if orch.task(id).await.map(|t| t.status()) == Some(TaskStatus::InProgress) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let snapshot = orch.cancel_task(id).await.unwrap();
    assert_eq!(snapshot.status(), TaskStatus::InProgress);

    let finished = worker.await.unwrap().unwrap().unwrap();
    assert_eq!(finished.status(), TaskStatus::Failed);
    assert!(finished.error_message().unwrap().contains("cancelled"));
}

#[tokio::test(start_paused = true)]
async fn test_loops_process_tasks_and_stop_on_shutdown() {
    let config = OrchestratorConfig {
        monitor_interval_secs: 10,
        process_interval_secs: 1,
        ..Default::default()
    };
    let orch = build(Arc::new(Recorder::default()), config);

    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(
            orch.submit_task(decision(TaskPriority::Medium, &format!("t{i}")))
                .await
                .unwrap(),
        );
    }

    let handles = orch.start();
    let mut last_completed = 0;
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let state_completed = orch
            .list_tasks()
            .await
            .iter()
            .filter(|t| t.status() == TaskStatus::Completed)
            .count();
        assert!(state_completed >= last_completed);
        last_completed = state_completed;
    }
    assert_eq!(last_completed, 3);

    for id in ids {
        let task = orch.task(id).await.unwrap();
        assert!(task.started_at.is_some());
        assert!(task.completed_at.unwrap() >= task.started_at.unwrap());
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(orch.system_state().await.completed_tasks, 3);

    orch.shutdown();
    handles.join().await;
    assert!(orch.is_shut_down());
}
