use axum::{Json, http::StatusCode};
use cadence_core::{Planner, PlannerResult};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub type Created<T> = (StatusCode, Json<Envelope<T>>);

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data })
}

pub fn created<T: Serialize>(data: T) -> Created<T> {
    (StatusCode::CREATED, ok(data))
}

/// Success without a payload.
pub fn message(text: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": text }))
}

/// Run a planner operation on the blocking pool.
pub async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Planner) -> PlannerResult<T> + Send + 'static,
    T: Send + 'static,
{
    let planner = state.planner.clone();
    tokio::task::spawn_blocking(move || f(&planner))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal(e)
        })?
        .map_err(ApiError::from)
}
