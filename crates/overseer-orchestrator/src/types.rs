use chrono::{DateTime, Utc};
use overseer_core::{OverseerError, OverseerResult, Params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// The agent a task is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Scores candidate actions and picks one.
    DecisionMaker,
    /// Runs a named multi-step procedure.
    ProcessAutomator,
    /// Reserved for monitoring work; no built-in handler.
    SystemMonitor,
    /// Optimization work produced by the monitoring loop; no built-in handler.
    Optimizer,
    /// Diagnoses an issue and runs a remediation plan.
    SelfHealer,
}

impl AgentType {
    /// Every agent type, in declaration order.
    pub const ALL: [AgentType; 5] = [
        AgentType::DecisionMaker,
        AgentType::ProcessAutomator,
        AgentType::SystemMonitor,
        AgentType::Optimizer,
        AgentType::SelfHealer,
    ];

    /// The wire tag, e.g. `"self_healer"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::DecisionMaker => "decision_maker",
            AgentType::ProcessAutomator => "process_automator",
            AgentType::SystemMonitor => "system_monitor",
            AgentType::Optimizer => "optimizer",
            AgentType::SelfHealer => "self_healer",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = OverseerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| OverseerError::Validation(format!("unknown agent type '{s}'")))
    }
}

/// Task urgency. Lower numeric value is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// 1
    Critical = 1,
    /// 2
    High = 2,
    /// 3
    Medium = 3,
    /// 4
    Low = 4,
}

impl TaskPriority {
    /// Numeric rank, 1 (most urgent) through 4.
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::Critical => write!(f, "critical"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::Low => write!(f, "low"),
        }
    }
}

/// Accepts a name (`"high"`, case-insensitive) or the numeric rank (`"2"`).
impl FromStr for TaskPriority {
    type Err = OverseerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" | "1" => Ok(TaskPriority::Critical),
            "high" | "2" => Ok(TaskPriority::High),
            "medium" | "3" => Ok(TaskPriority::Medium),
            "low" | "4" => Ok(TaskPriority::Low),
            other => Err(OverseerError::Validation(format!(
                "unknown priority '{other}'"
            ))),
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Completed and failed tasks never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A unit of scheduled work.
///
/// Priority and status are private: priority is fixed at construction and
/// status only moves forward through [`Task::start`], [`Task::complete`] and
/// [`Task::fail`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub agent_type: AgentType,
    priority: TaskPriority,
    pub description: String,
    #[serde(default)]
    pub parameters: Params,
    status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
}

impl Task {
    pub fn new(
        agent_type: AgentType,
        priority: TaskPriority,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_type,
            priority,
            description: description.into(),
            parameters: Params::new(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error_message: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Params) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// pending -> in_progress, stamping `started_at`.
    pub fn start(&mut self) -> OverseerResult<()> {
        self.transition(TaskStatus::Pending, TaskStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// in_progress -> completed with the agent's result payload.
    pub fn complete(&mut self, result: serde_json::Value) -> OverseerResult<()> {
        self.transition(TaskStatus::InProgress, TaskStatus::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// in_progress -> failed. A partial result (e.g. an automation outcome
    /// that stopped at step 2) may be kept alongside the error.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        partial: Option<serde_json::Value>,
    ) -> OverseerResult<()> {
        self.transition(TaskStatus::InProgress, TaskStatus::Failed)?;
        self.error_message = Some(error.into());
        self.result = partial;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, from: TaskStatus, to: TaskStatus) -> OverseerResult<()> {
        if self.status != from {
            return Err(OverseerError::InvalidTransition {
                task_id: self.id,
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Process-wide health and load snapshot, refreshed by the monitoring loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    pub timestamp: DateTime<Utc>,
    /// 0.0 (down) to 1.0 (fully healthy).
    pub health_score: f64,
    pub performance_metrics: HashMap<String, f64>,
    pub active_tasks: usize,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    /// 0.0 (idle) to 1.0 (saturated).
    pub system_load: f64,
    pub resource_usage: HashMap<String, f64>,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            health_score: 1.0,
            performance_metrics: HashMap::new(),
            active_tasks: 0,
            completed_tasks: 0,
            failed_tasks: 0,
            system_load: 0.0,
            resource_usage: HashMap::new(),
        }
    }
}
