use axum::{Extension, Json, extract::State};
use cadence_types::api::{Claims, CreateContextRequest, UpdateContextRequest, UpdateRoleRequest};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::envelope::{Created, Envelope, blocking, created, message, ok};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

type Data = ApiResult<Json<Envelope<Value>>>;

pub async fn create_context(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateContextRequest>,
) -> ApiResult<Created<Value>> {
    let context = blocking(&state, move |p| p.create_context(&req, claims.sub)).await?;
    Ok(created(json!({ "context": context })))
}

pub async fn list_contexts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Data {
    let contexts = blocking(&state, move |p| p.list_contexts(claims.sub)).await?;
    Ok(ok(json!({ "contexts": contexts })))
}

pub async fn get_context(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let context = blocking(&state, move |p| p.get_context(id, claims.sub)).await?;
    Ok(ok(json!({ "context": context })))
}

pub async fn update_context(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateContextRequest>,
) -> Data {
    let context = blocking(&state, move |p| p.update_context(id, &req, claims.sub)).await?;
    Ok(ok(json!({ "context": context })))
}

pub async fn join_by_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(code): ApiPath<String>,
) -> Data {
    let joined = blocking(&state, move |p| p.join_by_code(&code, claims.sub)).await?;
    Ok(ok(json!({ "join": joined })))
}

pub async fn join_by_id(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let joined = blocking(&state, move |p| p.join_by_id(id, claims.sub)).await?;
    Ok(ok(json!({ "join": joined })))
}

pub async fn leave_context(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    blocking(&state, move |p| p.leave_context(id, claims.sub)).await?;
    Ok(message("You left the context"))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let members = blocking(&state, move |p| p.list_members(id, claims.sub)).await?;
    Ok(ok(json!({ "members": members })))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateRoleRequest>,
) -> Data {
    let member = blocking(&state, move |p| p.update_role(id, user_id, &req.role, claims.sub)).await?;
    Ok(ok(json!({ "member": member })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    blocking(&state, move |p| p.remove_member(id, user_id, claims.sub)).await?;
    Ok(message("Member removed"))
}

pub async fn regenerate_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let code = blocking(&state, move |p| p.regenerate_invite_code(id, claims.sub)).await?;
    Ok(ok(json!({ "invite_code": code })))
}
