use thiserror::Error;
use uuid::Uuid;

/// A convenience `Result` alias using [`OverseerError`].
pub type OverseerResult<T> = Result<T, OverseerError>;

/// Top-level error type for the Overseer orchestrator.
///
/// Variants map onto the failure classes callers need to tell apart: input
/// rejected before anything is queued, a run that stopped part way, and
/// infrastructure failures.
#[derive(Error, Debug)]
pub enum OverseerError {
    /// Caller input was rejected before any state changed (bad agent type,
    /// priority, or parameter).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The process automator was asked for a template it does not know.
    #[error("Unknown process type: {0}")]
    UnknownTemplate(String),

    /// A process step reported failure, timed out, or was cancelled.
    #[error("Step '{step}' failed: {reason}")]
    StepExecution {
        /// Action name of the failing step.
        step: String,
        /// Executor-provided reason.
        reason: String,
    },

    /// A healing strategy reported failure, timed out, or was cancelled.
    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyExecution {
        /// Action name of the failing strategy.
        strategy: String,
        /// Executor-provided reason.
        reason: String,
    },

    /// The decision maker generated no candidate actions for the context.
    #[error("No decision options for '{0}'")]
    NoOptions(String),

    /// A task was dispatched to an agent type with no registered handler.
    #[error("No agent registered for agent type '{0}'")]
    NoAgent(String),

    /// The task queue is at capacity; the task was not stored.
    #[error("Task queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue bound.
        capacity: usize,
    },

    /// A task status change that would break the lifecycle ordering.
    #[error("Invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        /// Task being transitioned.
        task_id: Uuid,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// No task or record exists with the given id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The run was aborted through its cancellation token.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The telemetry source could not produce a sample.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OverseerError {
    /// True for errors raised before any state was touched, i.e. the caller
    /// sent something the orchestrator does not accept.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            OverseerError::Validation(_)
                | OverseerError::UnknownTemplate(_)
                | OverseerError::QueueFull { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_display() {
        let err = OverseerError::StepExecution {
            step: "create_backup".into(),
            reason: "disk full".into(),
        };
        assert_eq!(err.to_string(), "Step 'create_backup' failed: disk full");
    }

    #[test]
    fn test_queue_full_display() {
        let err = OverseerError::QueueFull { capacity: 8 };
        assert_eq!(err.to_string(), "Task queue full (capacity 8)");
    }

    #[test]
    fn test_rejection_classes() {
        assert!(OverseerError::Validation("bad".into()).is_rejection());
        assert!(OverseerError::UnknownTemplate("nope".into()).is_rejection());
        assert!(!OverseerError::Cancelled("stop".into()).is_rejection());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: OverseerError = parse.unwrap_err().into();
        assert!(matches!(err, OverseerError::Json(_)));
    }
}
