//! The three built-in agents and the dispatch seam the orchestrator uses to
//! reach them.

/// Multi-step process automation.
pub mod automation;
/// Rule-based decision making.
pub mod decision;
/// Issue diagnosis and remediation.
pub mod healing;

use crate::types::{AgentType, Task};
use async_trait::async_trait;
use automation::ProcessAutomatorAgent;
use decision::DecisionMakerAgent;
use healing::SelfHealerAgent;
use overseer_core::{OverseerError, OverseerResult, Params};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What an agent made of a task.
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    /// The task succeeded with this result payload.
    Completed(serde_json::Value),
    /// The run stopped part way; `partial` is kept on the task.
    Failed {
        error: String,
        partial: serde_json::Value,
    },
}

/// A capability that processes tasks addressed to one [`AgentType`].
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// Process `task`. `Err` means nothing useful was produced.
    async fn handle(&self, task: &Task, cancel: &CancellationToken)
        -> OverseerResult<AgentOutcome>;
}

/// Agent-type tag to handler lookup.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    handlers: HashMap<AgentType, Arc<dyn AgentHandler>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the handler for `agent_type`.
    pub fn register(&mut self, agent_type: AgentType, handler: Arc<dyn AgentHandler>) {
        self.handlers.insert(agent_type, handler);
    }

    pub fn get(&self, agent_type: AgentType) -> OverseerResult<Arc<dyn AgentHandler>> {
        self.handlers
            .get(&agent_type)
            .cloned()
            .ok_or_else(|| OverseerError::NoAgent(agent_type.to_string()))
    }

    pub fn is_registered(&self, agent_type: AgentType) -> bool {
        self.handlers.contains_key(&agent_type)
    }

    /// Registered agent types in declaration order.
    pub fn registered(&self) -> Vec<AgentType> {
        AgentType::ALL
            .into_iter()
            .filter(|t| self.handlers.contains_key(t))
            .collect()
    }
}

#[async_trait]
impl AgentHandler for DecisionMakerAgent {
    async fn handle(
        &self,
        task: &Task,
        _cancel: &CancellationToken,
    ) -> OverseerResult<AgentOutcome> {
        let decision = self.make_decision(&task.parameters)?;
        Ok(AgentOutcome::Completed(serde_json::to_value(decision)?))
    }
}

/// Expects `parameters.process_type`; the whole parameter map is passed on
/// to the executor.
#[async_trait]
impl AgentHandler for ProcessAutomatorAgent {
    async fn handle(&self, task: &Task, cancel: &CancellationToken) -> OverseerResult<AgentOutcome> {
        let process_type = task
            .parameters
            .get("process_type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                OverseerError::Validation("parameters.process_type is required".to_string())
            })?;

        let outcome = self
            .execute_automation_with_cancel(process_type, &task.parameters, cancel)
            .await?;
        let error = outcome.error.clone();
        let payload = serde_json::to_value(outcome)?;
        Ok(match error {
            None => AgentOutcome::Completed(payload),
            Some(error) => AgentOutcome::Failed {
                error,
                partial: payload,
            },
        })
    }
}

/// Tasks raised by the monitoring loop carry the issue under
/// `parameters.issue`; tasks from callers may put it at the top level.
#[async_trait]
impl AgentHandler for SelfHealerAgent {
    async fn handle(&self, task: &Task, cancel: &CancellationToken) -> OverseerResult<AgentOutcome> {
        let issue: Params = match task.parameters.get("issue") {
            Some(serde_json::Value::Object(issue)) => issue.clone(),
            _ => task.parameters.clone(),
        };

        let report = self.diagnose_and_heal_with_cancel(&issue, cancel).await?;
        let error = report.healing_result.error.clone();
        let payload = serde_json::to_value(report)?;
        Ok(match error {
            None => AgentOutcome::Completed(payload),
            Some(error) => AgentOutcome::Failed {
                error,
                partial: payload,
            },
        })
    }
}
