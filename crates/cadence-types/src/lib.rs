/// Cadence shared types.
///
/// `models` holds the domain values handed out by the planner, `api` the
/// request/response bodies of the HTTP surface and the JWT claims.
pub mod api;
pub mod models;
