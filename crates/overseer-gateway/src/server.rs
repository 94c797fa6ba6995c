use crate::error::ApiError;
use crate::middleware::{auth_middleware, AuthConfig};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware as axum_mw,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use overseer_core::{OverseerError, Params};
use overseer_orchestrator::{AgentType, Orchestrator, Task, TaskPriority};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Body of `POST /tasks`.
///
/// `priority` may be a name (`"high"`) or the numeric rank (`2` or `"2"`).
/// `agent_type`, `priority` and `description` are required.
#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub agent_type: String,
    pub priority: Value,
    pub description: String,
    #[serde(default)]
    pub parameters: Params,
}

impl TaskRequest {
    /// Validate the request into a pending task.
    pub fn into_task(self) -> Result<Task, OverseerError> {
        let agent_type: AgentType = self.agent_type.parse()?;
        let priority: TaskPriority = match &self.priority {
            Value::Null => {
                return Err(OverseerError::Validation("priority is required".to_string()))
            }
            Value::String(s) => s.parse()?,
            Value::Number(n) => n.to_string().parse()?,
            other => {
                return Err(OverseerError::Validation(format!(
                    "priority must be a name or number, got {other}"
                )))
            }
        };
        Ok(Task::new(agent_type, priority, self.description).with_parameters(self.parameters))
    }
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router. `/health` stays open when API keys are configured;
    /// every other route requires a key.
    pub fn build(orchestrator: Arc<Orchestrator>, auth: AuthConfig) -> Router {
        let state = Arc::new(AppState { orchestrator });

        let api = Router::new()
            .route("/tasks", post(create_task).get(list_tasks))
            .route("/tasks/{id}", delete(cancel_task))
            .route("/system-state", get(system_state))
            .route("/decisions", post(make_decision))
            .route("/automation/{process_type}", post(run_automation))
            .route("/healing", post(trigger_healing))
            .route_layer(axum_mw::from_fn_with_state(
                Arc::new(auth),
                auth_middleware,
            ));

        Router::new()
            .route("/health", get(health))
            .merge(api)
            .with_state(state)
    }
}

/// Unwrap a JSON body, reporting a malformed one as a validation error.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| OverseerError::Validation(rejection.body_text()).into())
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.health_status().await)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let task = json_body(payload)?.into_task()?;
    let task_id = state.orchestrator.submit_task(task).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "task_id": task_id,
            "status": "pending",
            "message": "Task created successfully",
        })),
    )
        .into_response())
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "tasks": state.orchestrator.list_tasks().await }))
}

async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let task = state.orchestrator.cancel_task(id).await?;
    Ok(Json(json!({ "task_id": task.id, "status": task.status() })))
}

async fn system_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.system_state().await)
}

async fn make_decision(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Params>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let context = json_body(payload)?;
    let decision = state.orchestrator.decision_maker().make_decision(&context)?;
    info!(decision_id = %decision.decision_id, action = %decision.selected_option.action, "Decision made");
    Ok(Json(serde_json::to_value(decision)?))
}

/// The body is optional; an empty body runs with no parameters.
async fn run_automation(
    State(state): State<Arc<AppState>>,
    Path(process_type): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let parameters: Params = if body.iter().all(u8::is_ascii_whitespace) {
        Params::new()
    } else {
        serde_json::from_slice(&body)?
    };
    let outcome = state
        .orchestrator
        .automator()
        .execute_automation(&process_type, &parameters)
        .await?;
    Ok(Json(serde_json::to_value(outcome)?))
}

async fn trigger_healing(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Params>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let issue = json_body(payload)?;
    let report = state.orchestrator.healer().diagnose_and_heal(&issue).await?;
    Ok(Json(serde_json::to_value(report)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn request(value: Value) -> TaskRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_task_request_named_priority() {
        let task = request(json!({
            "agent_type": "decision_maker",
            "priority": "Medium",
            "description": "decide"
        }))
        .into_task()
        .unwrap();
        assert_eq!(task.priority(), TaskPriority::Medium);
        assert_eq!(task.description, "decide");
        assert!(task.parameters.is_empty());
    }

    #[test]
    fn test_task_request_numeric_priority() {
        let task = request(json!({"agent_type": "self_healer", "priority": 1, "description": "heal"}))
            .into_task()
            .unwrap();
        assert_eq!(task.priority(), TaskPriority::Critical);

        let task = request(json!({"agent_type": "self_healer", "priority": "4", "description": "heal"}))
            .into_task()
            .unwrap();
        assert_eq!(task.priority(), TaskPriority::Low);
    }

    #[test]
    fn test_task_request_requires_priority_and_description() {
        for body in [
            json!({"agent_type": "decision_maker", "description": "decide"}),
            json!({"agent_type": "decision_maker", "priority": "high"}),
        ] {
            assert!(serde_json::from_value::<TaskRequest>(body).is_err());
        }

        let null_priority = json!({"agent_type": "decision_maker", "priority": null, "description": "decide"});
        assert!(matches!(
            request(null_priority).into_task(),
            Err(OverseerError::Validation(ref m)) if m.contains("priority")
        ));
    }

    #[test]
    fn test_task_request_rejects_bad_input() {
        for body in [
            json!({"agent_type": "janitor", "priority": 2, "description": "x"}),
            json!({"agent_type": "optimizer", "priority": 9, "description": "x"}),
            json!({"agent_type": "optimizer", "priority": "soon", "description": "x"}),
            json!({"agent_type": "optimizer", "priority": true, "description": "x"}),
        ] {
            assert!(matches!(
                request(body).into_task(),
                Err(OverseerError::Validation(_))
            ));
        }
    }
}
