use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use cadence_core::PlannerError;
use cadence_types::api::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};

use crate::envelope::blocking;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn decode_token(token: &str, secret: &str) -> ApiResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::unauthenticated("Token expired"),
        _ => ApiError::unauthenticated("Invalid token"),
    })
}

/// Verify the bearer token and make its `Claims` available to handlers.
/// Tokens of deleted accounts are refused.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| ApiError::unauthenticated("Access token required"))?;
    let claims = decode_token(bearer.token(), &state.jwt_secret)?;

    let user_id = claims.sub;
    blocking(&state, move |planner| planner.get_user(user_id))
        .await
        .map_err(|e| match e.0 {
            PlannerError::NotFound(_) => ApiError::unauthenticated("User not found"),
            other => ApiError(other),
        })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
