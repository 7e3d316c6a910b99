//! HTTP surface of the planner: axum handlers, bearer-token middleware and
//! the `{success, data | error}` JSON envelope.

pub mod auth;
pub mod contexts;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod mailer;
pub mod middleware;
pub mod oauth;
pub mod password_reset;
pub mod posts;
pub mod projects;
pub mod public;
pub mod router;
pub mod state;


pub use router::router;
pub use state::{AppState, AppStateInner, GoogleConfig};
