//! Google sign-in: redirect to the consent screen, then exchange the code for
//! a verified profile and hand the browser a token.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use cadence_core::PlannerError;
use cadence_core::identity::FederatedProfile;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::auth::{create_token, redeem};
use crate::envelope::blocking;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, GoogleConfig};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Deserialize)]
pub struct StartParams {
    /// Pending-join ticket, carried through Google as `state`.
    pub ticket: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: String,
    picture: Option<String>,
}

fn google(state: &AppState) -> ApiResult<&GoogleConfig> {
    state
        .google
        .as_ref()
        .ok_or_else(|| PlannerError::not_found("Google sign-in is not configured").into())
}

fn client_redirect(client_url: &str, path: &str, params: &[(&str, String)]) -> ApiResult<Redirect> {
    let mut url = Url::parse(client_url)
        .and_then(|base| base.join(path))
        .map_err(ApiError::internal)?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(Redirect::to(url.as_str()))
}

pub async fn start(
    State(state): State<AppState>,
    Query(params): Query<StartParams>,
) -> ApiResult<Redirect> {
    let google = google(&state)?;
    let url = Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", google.client_id.as_str()),
            ("redirect_uri", google.callback_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", params.ticket.as_deref().unwrap_or_default()),
        ],
    )
    .map_err(ApiError::internal)?;
    Ok(Redirect::to(url.as_str()))
}

fn failed(client_url: &str) -> ApiResult<Redirect> {
    client_redirect(client_url, "/login", &[("error", "google_auth_failed".to_string())])
}

pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let google = google(&state)?.clone();

    let Some(code) = params.code.filter(|_| params.error.is_none()) else {
        warn!("Google sign-in aborted: {:?}", params.error);
        return failed(&state.client_url);
    };

    let profile = match fetch_profile(&state.http, &google, &code).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Google code exchange failed: {:#}", e);
            return failed(&state.client_url);
        }
    };

    complete_sign_in(&state, profile, params.state).await
}

/// Upsert the account, redeem the join ticket and send the browser back with
/// a token. Every failure lands on the login page.
pub(crate) async fn complete_sign_in(
    state: &AppState,
    profile: FederatedProfile,
    ticket: Option<String>,
) -> ApiResult<Redirect> {
    let signed_in = blocking(state, move |planner| {
        let user = planner.sign_in_federated(&profile)?;
        let join = redeem(planner, ticket.as_deref(), &user);
        Ok((user, join))
    })
    .await;
    let (user, join) = match signed_in {
        Ok(signed_in) => signed_in,
        Err(ApiError(e)) => {
            warn!("Google sign-in rejected: {}", e);
            return failed(&state.client_url);
        }
    };

    let token = match create_token(&state.jwt_secret, &user, state.planner.now(), state.token_ttl) {
        Ok(token) => token,
        Err(e) => {
            warn!("Token for Google user {} not issued: {:#}", user.id, e);
            return failed(&state.client_url);
        }
    };
    info!("Google sign-in for user {}", user.id);

    let mut query = vec![("token", token)];
    if let Some(join) = join {
        query.push(("joined", join.context_id.to_string()));
    }
    client_redirect(&state.client_url, "/auth/callback", &query)
}

async fn fetch_profile(
    http: &reqwest::Client,
    google: &GoogleConfig,
    code: &str,
) -> anyhow::Result<FederatedProfile> {
    let token: TokenResponse = http
        .post(TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", google.callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let info: GoogleUserInfo = http
        .get(USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if !info.email_verified {
        anyhow::bail!("Google account email {} is not verified", info.email);
    }

    Ok(FederatedProfile {
        google_id: info.sub,
        email: info.email,
        full_name: info.name,
        avatar_url: info.picture,
    })
}
