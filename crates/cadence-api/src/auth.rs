use axum::{Extension, Json, extract::State};
use cadence_core::Planner;
use cadence_types::api::{
    AuthResponse, Claims, LoginRequest, PendingJoinRequest, PendingJoinResponse, RegisterRequest,
};
use cadence_types::models::{JoinResult, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tracing::debug;

use crate::envelope::{Created, Envelope, blocking, created, ok};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::mailer;
use crate::state::AppState;

pub fn create_token(
    secret: &str,
    user: &User,
    now: DateTime<Utc>,
    ttl: Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: (now + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Redeem an optional join ticket right after sign-in.
pub(crate) fn redeem(planner: &Planner, ticket: Option<&str>, user: &User) -> Option<JoinResult> {
    let ticket = ticket.map(str::trim).filter(|t| !t.is_empty())?;
    let joined = planner.consume_pending_join(ticket, user.id);
    debug!("Join ticket redeemed for {}: {}", user.id, joined.is_some());
    joined
}

fn signed_in(state: &AppState, user: User, join: Option<JoinResult>) -> ApiResult<AuthResponse> {
    let token = create_token(&state.jwt_secret, &user, state.planner.now(), state.token_ttl)
        .map_err(ApiError::internal)?;
    Ok(AuthResponse { user, token, join })
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Created<AuthResponse>> {
    let (user, join) = blocking(&state, move |planner| {
        let user = planner.register(&req)?;
        let join = redeem(planner, req.join_ticket.as_deref(), &user);
        Ok((user, join))
    })
    .await?;

    // Fire-and-forget; a failed welcome mail is only logged.
    let mail = mailer::welcome(&user.email, &user.full_name, &state.client_url);
    let outbox = state.mailer.clone();
    tokio::spawn(async move {
        outbox.send(&mail).await;
    });

    Ok(created(signed_in(&state, user, join)?))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Envelope<AuthResponse>>> {
    let (user, join) = blocking(&state, move |planner| {
        let user = planner.login(&req.email, &req.password)?;
        let join = redeem(planner, req.join_ticket.as_deref(), &user);
        Ok((user, join))
    })
    .await?;

    Ok(ok(signed_in(&state, user, join)?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Envelope<Value>>> {
    let user = blocking(&state, move |planner| planner.get_user(claims.sub)).await?;
    Ok(ok(json!({ "user": user })))
}

/// Park a join intent before sign-in. No authentication.
pub async fn pending_join(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PendingJoinRequest>,
) -> ApiResult<Created<PendingJoinResponse>> {
    let staged = blocking(&state, move |planner| planner.stage_pending_join(&req)).await?;
    Ok(created(staged))
}
