use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cadence_core::PlannerError;
use serde_json::json;
use tracing::error;

/// Planner failure rendered as `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub PlannerError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self(PlannerError::Unauthenticated(msg.into()))
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self(PlannerError::Unexpected(err.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PlannerError::Validation(_) | PlannerError::PreconditionFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            PlannerError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            PlannerError::Forbidden(_) => StatusCode::FORBIDDEN,
            PlannerError::NotFound(_) => StatusCode::NOT_FOUND,
            PlannerError::Conflict(_) => StatusCode::CONFLICT,
            PlannerError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            PlannerError::Unexpected(e) => {
                error!("Unexpected error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
