use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use overseer_core::OverseerError;
use tracing::{error, warn};

/// An [`OverseerError`] rendered as `{"success": false, "error": ...}` with
/// a status code chosen by variant.
#[derive(Debug)]
pub struct ApiError(pub OverseerError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            OverseerError::Validation(_) | OverseerError::Json(_) => StatusCode::BAD_REQUEST,
            OverseerError::UnknownTemplate(_) | OverseerError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            OverseerError::NoOptions(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OverseerError::InvalidTransition { .. } => StatusCode::CONFLICT,
            OverseerError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OverseerError> for ApiError {
    fn from(err: OverseerError) -> Self {
        Self(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self(OverseerError::Json(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_rejection() {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        } else if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }
        let body = serde_json::json!({ "success": false, "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (OverseerError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (OverseerError::UnknownTemplate("x".into()), StatusCode::NOT_FOUND),
            (OverseerError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (OverseerError::NoOptions("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (OverseerError::QueueFull { capacity: 1 }, StatusCode::SERVICE_UNAVAILABLE),
            (
                OverseerError::InvalidTransition {
                    task_id: Uuid::new_v4(),
                    from: "completed".into(),
                    to: "failed".into(),
                },
                StatusCode::CONFLICT,
            ),
            (OverseerError::Telemetry("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
