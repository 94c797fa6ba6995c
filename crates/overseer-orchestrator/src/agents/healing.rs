use crate::executor::{run_bounded, StrategyExecutor};
use chrono::{DateTime, Utc};
use overseer_core::{value_text, OverseerError, OverseerResult, Params};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Deadline for a single remediation strategy.
pub const DEFAULT_STRATEGY_TIMEOUT_SECS: u64 = 300;

/// Minutes assumed for a strategy missing from the estimate table.
const DEFAULT_STRATEGY_MINUTES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    ServiceUnavailable,
    ResourceExhaustion,
    PerformanceDegradation,
    Unknown,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueType::ServiceUnavailable => write!(f, "service_unavailable"),
            IssueType::ResourceExhaustion => write!(f, "resource_exhaustion"),
            IssueType::PerformanceDegradation => write!(f, "performance_degradation"),
            IssueType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Rule-based classification of a reported issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub root_cause: String,
    pub confidence: f64,
}

/// One remediation action; lower priority values run first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingStrategy {
    pub action: String,
    pub priority: u8,
    #[serde(default = "default_strategy_timeout")]
    pub timeout_secs: u64,
}

fn default_strategy_timeout() -> u64 {
    DEFAULT_STRATEGY_TIMEOUT_SECS
}

impl HealingStrategy {
    pub fn new(action: impl Into<String>, priority: u8) -> Self {
        Self {
            action: action.into(),
            priority,
            timeout_secs: DEFAULT_STRATEGY_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingPlan {
    pub plan_id: Uuid,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub strategies: Vec<HealingStrategy>,
    /// Minutes, summed from the per-action estimate table.
    pub estimated_duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    pub action: String,
    pub priority: u8,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate of a plan execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingExecution {
    pub execution_id: Uuid,
    pub success: bool,
    /// Strategies attempted, including a failing one.
    pub strategies_executed: usize,
    pub total_strategies: usize,
    /// Succeeded strategies over total strategies.
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<StrategyResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingReport {
    pub issue_id: String,
    pub diagnosis: Diagnosis,
    pub healing_plan: HealingPlan,
    pub healing_result: HealingExecution,
    pub timestamp: DateTime<Utc>,
}

impl HealingReport {
    pub fn success(&self) -> bool {
        self.healing_result.success
    }
}

/// Diagnoses issues by symptom pattern and runs the matching plan through an
/// injected [`StrategyExecutor`].
pub struct SelfHealerAgent {
    executor: Arc<dyn StrategyExecutor>,
}

impl SelfHealerAgent {
    pub fn new(executor: Arc<dyn StrategyExecutor>) -> Self {
        Self { executor }
    }

    pub async fn diagnose_and_heal(&self, issue: &Params) -> OverseerResult<HealingReport> {
        self.diagnose_and_heal_with_cancel(issue, &CancellationToken::new())
            .await
    }

    /// Diagnose, plan and execute, stopping at the first failed, timed-out
    /// or cancelled strategy.
    pub async fn diagnose_and_heal_with_cancel(
        &self,
        issue: &Params,
        cancel: &CancellationToken,
    ) -> OverseerResult<HealingReport> {
        let issue_id = issue
            .get("id")
            .map(value_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let diagnosis = Self::diagnose(issue);
        let plan = Self::healing_plan(&diagnosis);
        info!(
            issue_id = %issue_id,
            issue_type = %diagnosis.issue_type,
            severity = %diagnosis.severity,
            strategies = plan.strategies.len(),
            "Healing plan created"
        );

        let execution = self.execute_plan(&plan, &diagnosis, cancel).await;

        Ok(HealingReport {
            issue_id,
            diagnosis,
            healing_plan: plan,
            healing_result: execution,
            timestamp: Utc::now(),
        })
    }

    /// First matching symptom pattern wins.
    pub fn diagnose(issue: &Params) -> Diagnosis {
        let symptoms = issue.get("symptoms").map(value_text).unwrap_or_default();

        let (issue_type, severity, root_cause, confidence) = if symptoms.contains("connection_refused") {
            (
                IssueType::ServiceUnavailable,
                Severity::High,
                "Service is not running or not accessible",
                0.9,
            )
        } else if symptoms.contains("out_of_memory") {
            (
                IssueType::ResourceExhaustion,
                Severity::Critical,
                "Insufficient memory resources",
                0.95,
            )
        } else if symptoms.contains("timeout") {
            (
                IssueType::PerformanceDegradation,
                Severity::Medium,
                "Service response time exceeded threshold",
                0.8,
            )
        } else {
            (
                IssueType::Unknown,
                Severity::Medium,
                "Unable to determine root cause",
                0.3,
            )
        };

        Diagnosis {
            issue_type,
            severity,
            root_cause: root_cause.to_string(),
            confidence,
        }
    }

    pub fn healing_plan(diagnosis: &Diagnosis) -> HealingPlan {
        let rows: &[(&str, u8)] = match diagnosis.issue_type {
            IssueType::ServiceUnavailable => &[
                ("restart_service", 1),
                ("check_dependencies", 2),
                ("verify_configuration", 3),
            ],
            IssueType::ResourceExhaustion => &[
                ("scale_resources", 1),
                ("optimize_memory_usage", 2),
                ("restart_services", 3),
            ],
            IssueType::PerformanceDegradation => &[
                ("analyze_performance", 1),
                ("optimize_queries", 2),
                ("scale_horizontally", 3),
            ],
            IssueType::Unknown => &[("investigate_issue", 1), ("collect_logs", 2)],
        };
        let strategies: Vec<HealingStrategy> = rows
            .iter()
            .map(|&(action, priority)| HealingStrategy::new(action, priority))
            .collect();

        HealingPlan {
            plan_id: Uuid::new_v4(),
            issue_type: diagnosis.issue_type,
            severity: diagnosis.severity,
            estimated_duration: estimate_minutes(&strategies),
            strategies,
        }
    }

    async fn execute_plan(
        &self,
        plan: &HealingPlan,
        diagnosis: &Diagnosis,
        cancel: &CancellationToken,
    ) -> HealingExecution {
        let execution_id = Uuid::new_v4();
        let total = plan.strategies.len();
        let mut results = Vec::with_capacity(total);
        let mut error = None;

        for strategy in &plan.strategies {
            let start = Instant::now();
            let outcome = run_bounded(
                self.executor.execute_strategy(strategy, diagnosis),
                strategy.timeout(),
                cancel,
            )
            .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let failure = match outcome {
                Ok(Ok(output)) => {
                    results.push(StrategyResult {
                        action: strategy.action.clone(),
                        priority: strategy.priority,
                        success: true,
                        duration_ms,
                        output: Some(output),
                        error: None,
                    });
                    continue;
                }
                Ok(Err(OverseerError::StrategyExecution { reason, .. })) => reason,
                Ok(Err(other)) => other.to_string(),
                Err(interrupted) => interrupted.to_string(),
            };

            warn!(
                execution_id = %execution_id,
                strategy = %strategy.action,
                error = %failure,
                "Healing strategy failed"
            );
            results.push(StrategyResult {
                action: strategy.action.clone(),
                priority: strategy.priority,
                success: false,
                duration_ms,
                output: None,
                error: Some(failure.clone()),
            });
            error = Some(format!("Strategy '{}' failed: {failure}", strategy.action));
            break;
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        HealingExecution {
            execution_id,
            success: error.is_none(),
            strategies_executed: results.len(),
            total_strategies: total,
            success_rate: if total == 0 {
                0.0
            } else {
                succeeded as f64 / total as f64
            },
            error,
            results,
        }
    }
}

fn estimate_minutes(strategies: &[HealingStrategy]) -> u32 {
    strategies
        .iter()
        .map(|s| match s.action.as_str() {
            "restart_service" => 5,
            "scale_resources" => 10,
            "optimize_memory_usage" => 15,
            "analyze_performance" => 20,
            "investigate_issue" => 30,
            _ => DEFAULT_STRATEGY_MINUTES,
        })
        .sum()
}
