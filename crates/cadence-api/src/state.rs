use std::sync::Arc;

use cadence_core::Planner;
use chrono::Duration;

use crate::mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub planner: Arc<Planner>,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub mailer: Mailer,
    /// Browser-facing origin used for links and OAuth redirects.
    pub client_url: String,
    /// `None` disables the Google routes.
    pub google: Option<GoogleConfig>,
    pub http: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}
