//! Executor capabilities the agents delegate real work to.
//!
//! The automation and healing agents only sequence actions and aggregate
//! their results. Performing an action is the job of a [`StepExecutor`] or
//! [`StrategyExecutor`] injected at construction; [`CommandExecutor`] is the
//! shell-backed implementation the CLI wires in.

use crate::agents::automation::ProcessStep;
use crate::agents::healing::{Diagnosis, HealingStrategy};
use async_trait::async_trait;
use overseer_core::{OverseerError, OverseerResult, Params};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Performs one step of an automation template.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run `step`. `Ok` carries executor output, `Err` marks the step failed.
    async fn execute_step(
        &self,
        step: &ProcessStep,
        parameters: &Params,
    ) -> OverseerResult<serde_json::Value>;
}

/// Performs one remediation strategy of a healing plan.
#[async_trait]
pub trait StrategyExecutor: Send + Sync {
    /// Run `strategy` for the diagnosed issue.
    async fn execute_strategy(
        &self,
        strategy: &HealingStrategy,
        diagnosis: &Diagnosis,
    ) -> OverseerResult<serde_json::Value>;
}

/// Why a bounded executor call did not finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupted {
    TimedOut(Duration),
    Cancelled,
}

impl std::fmt::Display for Interrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interrupted::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            Interrupted::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Await `fut` unless `limit` elapses or `cancel` fires first.
pub async fn run_bounded<F, T>(
    fut: F,
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<T, Interrupted>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
        res = tokio::time::timeout(limit, fut) => res.map_err(|_| Interrupted::TimedOut(limit)),
    }
}

/// Runs the shell command configured for each action name.
///
/// Parameters reach the command as the `OVERSEER_PARAMS` environment
/// variable (JSON); the action name as `OVERSEER_ACTION`. Exit status zero is
/// success. An action with no configured command fails rather than being
/// skipped.
pub struct CommandExecutor {
    commands: HashMap<String, String>,
}

impl CommandExecutor {
    pub fn new(commands: HashMap<String, String>) -> Self {
        Self { commands }
    }

    /// Action names with a configured command, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    async fn run(&self, action: &str, env: &[(&str, String)]) -> Result<serde_json::Value, String> {
        let command = self
            .commands
            .get(action)
            .ok_or_else(|| format!("no command configured for action '{action}'"))?;

        info!(action = %action, command = %command, "Executing action command");

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command).kill_on_drop(true);
        cmd.env("OVERSEER_ACTION", action);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| format!("failed to spawn command: {e}"))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        let response = serde_json::json!({
            "exit_code": exit_code,
            "stdout": truncate_output(&stdout, 50_000),
            "stderr": truncate_output(&stderr, 10_000),
        });

        if output.status.success() {
            Ok(response)
        } else {
            warn!(action = %action, exit_code, "Action command failed");
            Err(format!(
                "exit code {exit_code}: {}",
                truncate_output(stderr.trim(), 500)
            ))
        }
    }
}

#[async_trait]
impl StepExecutor for CommandExecutor {
    async fn execute_step(
        &self,
        step: &ProcessStep,
        parameters: &Params,
    ) -> OverseerResult<serde_json::Value> {
        let params = serde_json::to_string(parameters)?;
        self.run(&step.action, &[("OVERSEER_PARAMS", params)])
            .await
            .map_err(|reason| OverseerError::StepExecution {
                step: step.action.clone(),
                reason,
            })
    }
}

#[async_trait]
impl StrategyExecutor for CommandExecutor {
    async fn execute_strategy(
        &self,
        strategy: &HealingStrategy,
        diagnosis: &Diagnosis,
    ) -> OverseerResult<serde_json::Value> {
        let env = [
            ("OVERSEER_ISSUE_TYPE", diagnosis.issue_type.to_string()),
            ("OVERSEER_SEVERITY", diagnosis.severity.to_string()),
        ];
        self.run(&strategy.action, &env)
            .await
            .map_err(|reason| OverseerError::StrategyExecution {
                strategy: strategy.action.clone(),
                reason,
            })
    }
}

fn truncate_output(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated, {} total bytes]", &s[..cut], s.len())
}
