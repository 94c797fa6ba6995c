//! Task queue, agents and background loops of the Overseer meta-agent.
//!
//! The [`Orchestrator`] owns a bounded priority [`TaskQueue`], a
//! [`SystemMonitor`] holding the current [`SystemState`], and a registry of
//! [`AgentHandler`]s. Two loops run on tokio intervals: monitoring samples a
//! [`TelemetrySource`] and turns threshold breaches into healing tasks;
//! processing dispatches one queued task per tick.
//!
//! # Main types
//!
//! - [`Orchestrator`]: queue, state, agents and loop control.
//! - [`DecisionMakerAgent`]: scores a fixed option table against a context.
//! - [`ProcessAutomatorAgent`]: runs named step templates through a [`StepExecutor`].
//! - [`SelfHealerAgent`]: diagnoses issues and runs plans through a [`StrategyExecutor`].
//! - [`CommandExecutor`] and [`SysinfoTelemetry`]: shell and sysinfo backed collaborators.

/// Built-in agents and the handler registry.
pub mod agents;
/// Loop intervals, queue bound and thresholds.
pub mod config;
/// Orchestrator engine and background loops.
pub mod engine;
/// Executor traits, bounded execution and the shell executor.
pub mod executor;
/// System state snapshot and issue detection.
pub mod monitor;
/// Bounded priority task queue.
pub mod task_queue;
/// Telemetry sources.
pub mod telemetry;
/// Tasks, priorities, statuses and system state.
pub mod types;

pub use agents::automation::{
    AutomationOutcome, ProcessAutomatorAgent, ProcessStep, ProcessTemplate, StepResult,
};
pub use agents::decision::{Decision, DecisionMakerAgent, DecisionOption, DecisionType};
pub use agents::healing::{
    Diagnosis, HealingExecution, HealingPlan, HealingReport, HealingStrategy, IssueType,
    SelfHealerAgent, Severity,
};
pub use agents::{AgentHandler, AgentOutcome, AgentRegistry};
pub use config::OrchestratorConfig;
pub use engine::{HealthStatus, LoopHandles, Orchestrator};
pub use executor::{run_bounded, CommandExecutor, Interrupted, StepExecutor, StrategyExecutor};
pub use monitor::{DetectedIssue, Optimization, SystemMonitor, TaskCounters};
pub use task_queue::TaskQueue;
pub use telemetry::{SysinfoTelemetry, TelemetrySample, TelemetrySource};
pub use types::{AgentType, SystemState, Task, TaskPriority, TaskStatus};
