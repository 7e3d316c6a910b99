use axum::{Extension, Json, extract::State};
use cadence_types::api::{AddProjectMemberRequest, Claims, CreateProjectRequest, UpdateProjectRequest};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::envelope::{Created, Envelope, blocking, created, message, ok};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

type Data = ApiResult<Json<Envelope<Value>>>;

pub async fn create_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(context_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<Created<Value>> {
    let project = blocking(&state, move |p| p.create_project(context_id, &req, claims.sub)).await?;
    Ok(created(json!({ "project": project })))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(context_id): ApiPath<Uuid>,
) -> Data {
    let projects = blocking(&state, move |p| p.list_projects(context_id, claims.sub)).await?;
    Ok(ok(json!({ "projects": projects })))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let project = blocking(&state, move |p| p.get_project(id, claims.sub)).await?;
    Ok(ok(json!({ "project": project })))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Data {
    let project = blocking(&state, move |p| p.update_project(id, &req, claims.sub)).await?;
    Ok(ok(json!({ "project": project })))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    blocking(&state, move |p| p.delete_project(id, claims.sub)).await?;
    Ok(message("Project deleted"))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let members = blocking(&state, move |p| p.list_project_members(id, claims.sub)).await?;
    Ok(ok(json!({ "members": members })))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddProjectMemberRequest>,
) -> ApiResult<Created<Value>> {
    let member = blocking(&state, move |p| p.add_project_member(id, req.user_id, claims.sub)).await?;
    Ok(created(json!({ "member": member })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    blocking(&state, move |p| p.remove_project_member(id, user_id, claims.sub)).await?;
    Ok(message("Member removed from project"))
}
