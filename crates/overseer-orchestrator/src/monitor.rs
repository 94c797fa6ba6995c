use crate::config::OrchestratorConfig;
use crate::telemetry::TelemetrySample;
use crate::types::SystemState;
use chrono::{DateTime, Utc};
use overseer_core::Params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Task counts maintained by the processing loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounters {
    pub active: usize,
    pub completed: u64,
    pub failed: u64,
}

/// A threshold breach found in a [`SystemState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: String,
    pub symptoms: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Something worth optimizing, found in a [`SystemState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    #[serde(rename = "type")]
    pub optimization_type: String,
    pub description: String,
    pub potential_benefit: String,
}

fn to_params<T: Serialize>(value: &T) -> Params {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Params::new(),
    }
}

impl DetectedIssue {
    pub fn to_params(&self) -> Params {
        to_params(self)
    }
}

impl Optimization {
    pub fn to_params(&self) -> Params {
        to_params(self)
    }
}

/// Owns the [`SystemState`] snapshot and the thresholds evaluated against it.
pub struct SystemMonitor {
    state: Arc<RwLock<SystemState>>,
    health_threshold: f64,
    load_threshold: f64,
    optimization_threshold: u64,
}

impl SystemMonitor {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(SystemState::default())),
            health_threshold: config.health_threshold,
            load_threshold: config.load_threshold,
            optimization_threshold: config.optimization_threshold,
        }
    }

    /// Apply a telemetry sample and the current task counts in one write.
    ///
    /// Completed and failed counts never go backwards, even if a caller
    /// passes stale counters.
    pub async fn refresh(&self, sample: TelemetrySample, counters: TaskCounters) -> SystemState {
        let mut state = self.state.write().await;
        state.timestamp = Utc::now();
        state.health_score = sample.health_score.clamp(0.0, 1.0);
        state.system_load = sample.system_load.clamp(0.0, 1.0);
        state.resource_usage = sample.resource_usage;
        state.performance_metrics = sample.performance_metrics;
        state.active_tasks = counters.active;
        state.completed_tasks = state.completed_tasks.max(counters.completed);
        state.failed_tasks = state.failed_tasks.max(counters.failed);
        state.clone()
    }

    /// Get a snapshot of the current state.
    pub async fn snapshot(&self) -> SystemState {
        self.state.read().await.clone()
    }

    /// Health below threshold and load above threshold each raise an issue.
    pub fn detect_issues(&self, state: &SystemState) -> Vec<DetectedIssue> {
        let mut issues = Vec::new();
        if state.health_score < self.health_threshold {
            issues.push(DetectedIssue {
                issue_type: "health_degradation".to_string(),
                severity: "medium".to_string(),
                symptoms: vec!["low_health_score".to_string()],
                timestamp: Utc::now(),
            });
        }
        if state.system_load > self.load_threshold {
            issues.push(DetectedIssue {
                issue_type: "high_load".to_string(),
                severity: "high".to_string(),
                symptoms: vec!["high_system_load".to_string()],
                timestamp: Utc::now(),
            });
        }
        issues
    }

    pub fn detect_optimizations(&self, state: &SystemState) -> Vec<Optimization> {
        if state.completed_tasks > self.optimization_threshold {
            vec![Optimization {
                optimization_type: "task_cleanup".to_string(),
                description: "Clean up completed tasks".to_string(),
                potential_benefit: "memory_optimization".to_string(),
            }]
        } else {
            Vec::new()
        }
    }

    /// Serialize the current state as JSON.
    pub async fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot().await).unwrap_or_default()
    }
}
