use axum::{Extension, Json, extract::State};
use cadence_types::api::{Claims, CreatePostRequest, UpdatePostRequest};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::envelope::{Created, Envelope, blocking, created, message, ok};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

type Data = ApiResult<Json<Envelope<Value>>>;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> ApiResult<Created<Value>> {
    let post = blocking(&state, move |p| p.create_post(project_id, &req, claims.sub)).await?;
    Ok(created(json!({ "post": post })))
}

pub async fn list_project_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Data {
    let posts = blocking(&state, move |p| p.list_project_posts(project_id, claims.sub)).await?;
    Ok(ok(json!({ "posts": posts })))
}

pub async fn list_context_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(context_id): ApiPath<Uuid>,
) -> Data {
    let posts = blocking(&state, move |p| p.list_context_posts(context_id, claims.sub)).await?;
    Ok(ok(json!({ "posts": posts })))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let post = blocking(&state, move |p| p.get_post(id, claims.sub)).await?;
    Ok(ok(json!({ "post": post })))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> Data {
    let post = blocking(&state, move |p| p.update_post(id, &req, claims.sub)).await?;
    Ok(ok(json!({ "post": post })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    blocking(&state, move |p| p.delete_post(id, claims.sub)).await?;
    Ok(message("Post deleted"))
}

pub async fn approve_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Data {
    let post = blocking(&state, move |p| p.approve_post(id, claims.sub)).await?;
    Ok(ok(json!({ "post": post })))
}
