use crate::executor::{run_bounded, StepExecutor};
use overseer_core::{OverseerError, OverseerResult, Params};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// One action in a process template with its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub action: String,
    pub timeout_secs: u64,
}

impl ProcessStep {
    pub fn new(action: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            action: action.into(),
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// An ordered list of steps run strictly in sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTemplate {
    pub steps: Vec<ProcessStep>,
}

impl ProcessTemplate {
    pub fn new(steps: Vec<ProcessStep>) -> Self {
        Self { steps }
    }

    fn from_rows(rows: &[(&str, u64)]) -> Self {
        Self::new(
            rows.iter()
                .map(|&(action, timeout)| ProcessStep::new(action, timeout))
                .collect(),
        )
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub action: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of an automation run, including partial progress on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationOutcome {
    pub process_id: Uuid,
    pub process_type: String,
    pub success: bool,
    /// Error of the step that stopped the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<StepResult>,
    /// Steps attempted, including a failing one.
    pub completed_steps: usize,
    pub total_steps: usize,
}

/// Runs named multi-step procedures through an injected [`StepExecutor`].
pub struct ProcessAutomatorAgent {
    templates: RwLock<HashMap<String, ProcessTemplate>>,
    executor: Arc<dyn StepExecutor>,
}

impl ProcessAutomatorAgent {
    /// Create an automator with the built-in `deployment`, `scaling` and
    /// `backup` templates.
    pub fn new(executor: Arc<dyn StepExecutor>) -> Self {
        Self {
            templates: RwLock::new(builtin_templates()),
            executor,
        }
    }

    /// Add or replace a template.
    pub fn register_template(
        &self,
        name: impl Into<String>,
        template: ProcessTemplate,
    ) -> OverseerResult<()> {
        let name = name.into();
        if template.steps.is_empty() {
            return Err(OverseerError::Validation(format!(
                "template '{name}' has no steps"
            )));
        }
        info!(process_type = %name, steps = template.steps.len(), "Template registered");
        self.templates.write().insert(name, template);
        Ok(())
    }

    /// Registered template names, sorted.
    pub fn templates(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn template(&self, process_type: &str) -> Option<ProcessTemplate> {
        self.templates.read().get(process_type).cloned()
    }

    /// Run `process_type` to completion or first failure.
    pub async fn execute_automation(
        &self,
        process_type: &str,
        parameters: &Params,
    ) -> OverseerResult<AutomationOutcome> {
        self.execute_automation_with_cancel(process_type, parameters, &CancellationToken::new())
            .await
    }

    /// Like [`execute_automation`](Self::execute_automation), abandoning the
    /// run when `cancel` fires. A cancelled or timed-out step counts as failed.
    pub async fn execute_automation_with_cancel(
        &self,
        process_type: &str,
        parameters: &Params,
        cancel: &CancellationToken,
    ) -> OverseerResult<AutomationOutcome> {
        let template = self
            .template(process_type)
            .ok_or_else(|| OverseerError::UnknownTemplate(process_type.to_string()))?;

        let process_id = Uuid::new_v4();
        let total_steps = template.steps.len();
        let mut results = Vec::with_capacity(total_steps);

        info!(process_id = %process_id, process_type = %process_type, total_steps, "Automation started");

        for step in &template.steps {
            let start = Instant::now();
            let outcome = run_bounded(
                self.executor.execute_step(step, parameters),
                step.timeout(),
                cancel,
            )
            .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let failure = match outcome {
                Ok(Ok(output)) => {
                    results.push(StepResult {
                        action: step.action.clone(),
                        success: true,
                        duration_ms,
                        output: Some(output),
                        error: None,
                    });
                    continue;
                }
                Ok(Err(e)) => step_reason(e),
                Err(interrupted) => interrupted.to_string(),
            };

            warn!(
                process_id = %process_id,
                step = %step.action,
                error = %failure,
                "Automation step failed"
            );
            results.push(StepResult {
                action: step.action.clone(),
                success: false,
                duration_ms,
                output: None,
                error: Some(failure.clone()),
            });
            return Ok(AutomationOutcome {
                process_id,
                process_type: process_type.to_string(),
                success: false,
                error: Some(format!("Step '{}' failed: {failure}", step.action)),
                completed_steps: results.len(),
                total_steps,
                results,
            });
        }

        info!(process_id = %process_id, "Automation completed");
        Ok(AutomationOutcome {
            process_id,
            process_type: process_type.to_string(),
            success: true,
            error: None,
            completed_steps: results.len(),
            total_steps,
            results,
        })
    }
}

/// Strip the step wrapper so the outcome error does not name the step twice.
fn step_reason(err: OverseerError) -> String {
    match err {
        OverseerError::StepExecution { reason, .. } => reason,
        other => other.to_string(),
    }
}

fn builtin_templates() -> HashMap<String, ProcessTemplate> {
    HashMap::from([
        (
            "deployment".to_string(),
            ProcessTemplate::from_rows(&[
                ("validate_config", 30),
                ("build_images", 300),
                ("run_tests", 120),
                ("deploy_services", 180),
                ("verify_deployment", 60),
            ]),
        ),
        (
            "scaling".to_string(),
            ProcessTemplate::from_rows(&[
                ("analyze_load", 30),
                ("calculate_requirements", 15),
                ("provision_resources", 120),
                ("update_configuration", 30),
                ("verify_scaling", 60),
            ]),
        ),
        (
            "backup".to_string(),
            ProcessTemplate::from_rows(&[
                ("prepare_backup", 30),
                ("create_backup", 600),
                ("verify_backup", 60),
                ("cleanup_old_backups", 120),
            ]),
        ),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records every step it sees and fails the ones listed.
    #[derive(Default)]
    struct ScriptedSteps {
        fail_on: Vec<&'static str>,
        hang_on: Vec<&'static str>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StepExecutor for ScriptedSteps {
        async fn execute_step(
            &self,
            step: &ProcessStep,
            _parameters: &Params,
        ) -> OverseerResult<serde_json::Value> {
            self.seen.lock().push(step.action.clone());
            if self.hang_on.contains(&step.action.as_str()) {
                std::future::pending::<()>().await;
            }
            if self.fail_on.contains(&step.action.as_str()) {
                return Err(OverseerError::StepExecution {
                    step: step.action.clone(),
                    reason: "disk full".into(),
                });
            }
            Ok(serde_json::json!({"done": step.action}))
        }
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let exec = Arc::new(ScriptedSteps::default());
        let agent = ProcessAutomatorAgent::new(exec.clone());
        let outcome = agent
            .execute_automation("deployment", &Params::new())
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.completed_steps, 5);
        assert_eq!(outcome.total_steps, 5);
        assert_eq!(outcome.results.len(), 5);
        assert!(outcome.error.is_none());
        assert_eq!(exec.seen.lock()[0], "validate_config");
    }

    #[tokio::test]
    async fn test_backup_fails_fast_at_create_backup() {
        let exec = Arc::new(ScriptedSteps {
            fail_on: vec!["create_backup"],
            ..Default::default()
        });
        let agent = ProcessAutomatorAgent::new(exec.clone());
        let outcome = agent.execute_automation("backup", &Params::new()).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.completed_steps, 2);
        assert_eq!(outcome.total_steps, 4);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Step 'create_backup' failed: disk full")
        );
        assert_eq!(*exec.seen.lock(), vec!["prepare_backup", "create_backup"]);
    }

    #[tokio::test]
    async fn test_unknown_process_type() {
        let exec = Arc::new(ScriptedSteps::default());
        let agent = ProcessAutomatorAgent::new(exec.clone());
        let err = agent
            .execute_automation("teleport", &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OverseerError::UnknownTemplate(ref t) if t == "teleport"));
        assert!(exec.seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timeout_is_enforced() {
        let exec = Arc::new(ScriptedSteps {
            hang_on: vec!["calculate_requirements"],
            ..Default::default()
        });
        let agent = ProcessAutomatorAgent::new(exec);
        let outcome = agent.execute_automation("scaling", &Params::new()).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.completed_steps, 2);
        let failed = outcome.results.last().unwrap();
        assert_eq!(failed.action, "calculate_requirements");
        assert_eq!(failed.error.as_deref(), Some("timed out after 15s"));
    }

    #[tokio::test]
    async fn test_cancellation_halts_run() {
        let exec = Arc::new(ScriptedSteps {
            hang_on: vec!["build_images"],
            ..Default::default()
        });
        let agent = Arc::new(ProcessAutomatorAgent::new(exec));
        let token = CancellationToken::new();

        let run = {
            let agent = agent.clone();
            let token = token.clone();
            tokio::spawn(async move {
                agent
                    .execute_automation_with_cancel("deployment", &Params::new(), &token)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let outcome = run.await.unwrap().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.completed_steps, 2);
        assert!(outcome.error.unwrap().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_register_custom_template() {
        let agent = ProcessAutomatorAgent::new(Arc::new(ScriptedSteps::default()));
        agent
            .register_template(
                "rotate_keys",
                ProcessTemplate::new(vec![ProcessStep::new("rotate", 10)]),
            )
            .unwrap();
        assert_eq!(
            agent.templates(),
            vec!["backup", "deployment", "rotate_keys", "scaling"]
        );
        let outcome = agent
            .execute_automation("rotate_keys", &Params::new())
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.total_steps, 1);

        assert!(agent
            .register_template("empty", ProcessTemplate::new(vec![]))
            .is_err());
    }

    #[test]
    fn test_builtin_timeouts() {
        let templates = builtin_templates();
        let backup = &templates["backup"];
        assert_eq!(backup.steps[1], ProcessStep::new("create_backup", 600));
        assert_eq!(templates["deployment"].steps.len(), 5);
    }
}
