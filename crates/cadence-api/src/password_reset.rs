use axum::{Json, extract::State};
use cadence_types::api::{
    DeliveryStatus, ForgotPasswordRequest, ForgotPasswordResponse, ResetPasswordRequest,
    VerifyResetTokenRequest,
};
use serde_json::Value;
use url::Url;

use crate::envelope::{Envelope, blocking, message, ok};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::mailer;
use crate::state::AppState;

const GENERIC_REPLY: &str =
    "If an account exists with that email, a password reset link has been sent.";

/// Issue a reset token and mail the link. Unknown emails get the same reply.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<Envelope<ForgotPasswordResponse>>> {
    let issued = blocking(&state, move |planner| planner.request_password_reset(&req.email)).await?;

    let Some(issued) = issued else {
        return Ok(ok(ForgotPasswordResponse {
            message: GENERIC_REPLY.to_string(),
            delivery: None,
        }));
    };

    let mut link = Url::parse(&state.client_url)
        .and_then(|base| base.join("/reset-password"))
        .map_err(ApiError::internal)?;
    link.query_pairs_mut().append_pair("token", &issued.token);

    let mail = mailer::password_reset(&issued.user.email, &issued.user.full_name, link.as_str());
    let delivery = state.mailer.send(&mail).await;
    let message = match delivery {
        DeliveryStatus::Logged => "Password reset link generated. Check the server log for the link.",
        DeliveryStatus::Sent | DeliveryStatus::Failed => GENERIC_REPLY,
    };

    Ok(ok(ForgotPasswordResponse {
        message: message.to_string(),
        delivery: Some(delivery),
    }))
}

pub async fn verify_reset_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyResetTokenRequest>,
) -> ApiResult<Json<Value>> {
    blocking(&state, move |planner| planner.verify_reset_token(&req.token)).await?;
    Ok(message("Token is valid"))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    blocking(&state, move |planner| planner.reset_password(&req.token, &req.password)).await?;
    Ok(message("Password has been reset successfully"))
}
