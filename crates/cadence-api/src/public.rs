use axum::{Json, extract::State};
use cadence_types::models::{PublicContext, PublicDashboard};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::envelope::{Envelope, blocking, ok};
use crate::error::ApiResult;
use crate::extract::ApiPath;
use crate::state::AppState;

pub async fn dashboard(
    State(state): State<AppState>,
    ApiPath(context_id): ApiPath<Uuid>,
) -> ApiResult<Json<Envelope<PublicDashboard>>> {
    let dashboard = blocking(&state, move |p| p.dashboard(context_id)).await?;
    Ok(ok(dashboard))
}

pub async fn context(
    State(state): State<AppState>,
    ApiPath(context_id): ApiPath<Uuid>,
) -> ApiResult<Json<Envelope<Value>>> {
    let context: PublicContext = blocking(&state, move |p| p.public_context(context_id)).await?;
    Ok(ok(json!({ "context": context })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}
