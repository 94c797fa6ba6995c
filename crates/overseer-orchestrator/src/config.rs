use overseer_core::{OverseerError, OverseerResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the orchestrator loops, queue bound and issue thresholds.
///
/// Every field has a default so a partial `[orchestrator]` table is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds between monitoring-loop refreshes.
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
    /// Seconds between task-processing ticks.
    #[serde(default = "default_process_interval")]
    pub process_interval_secs: u64,
    /// Maximum pending tasks; further enqueues fail with `QueueFull`.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Decision records retained for confidence calculation.
    #[serde(default = "default_history_capacity")]
    pub decision_history_capacity: usize,
    /// A health score below this raises a `health_degradation` issue.
    #[serde(default = "default_health_threshold")]
    pub health_threshold: f64,
    /// A system load above this raises a `high_load` issue.
    #[serde(default = "default_load_threshold")]
    pub load_threshold: f64,
    /// More completed tasks than this raises a cleanup optimization.
    #[serde(default = "default_optimization_threshold")]
    pub optimization_threshold: u64,
}

fn default_monitor_interval() -> u64 {
    60
}
fn default_process_interval() -> u64 {
    5
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_history_capacity() -> usize {
    1000
}
fn default_health_threshold() -> f64 {
    0.8
}
fn default_load_threshold() -> f64 {
    0.9
}
fn default_optimization_threshold() -> u64 {
    100
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: default_monitor_interval(),
            process_interval_secs: default_process_interval(),
            queue_capacity: default_queue_capacity(),
            decision_history_capacity: default_history_capacity(),
            health_threshold: default_health_threshold(),
            load_threshold: default_load_threshold(),
            optimization_threshold: default_optimization_threshold(),
        }
    }
}

impl OrchestratorConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_secs(self.process_interval_secs)
    }

    /// Reject values the loops cannot run with.
    pub fn validate(&self) -> OverseerResult<()> {
        if self.monitor_interval_secs == 0 || self.process_interval_secs == 0 {
            return Err(OverseerError::Config(
                "loop intervals must be at least one second".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(OverseerError::Config(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.decision_history_capacity == 0 {
            return Err(OverseerError::Config(
                "decision_history_capacity must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("health_threshold", self.health_threshold),
            ("load_threshold", self.load_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OverseerError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}
