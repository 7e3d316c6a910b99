use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, contexts, oauth, password_reset, posts, projects, public};

/// Every route lives under `/api`. CORS and tracing layers are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let open_routes = Router::new()
        .route("/health", get(public::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/pending-join", post(auth::pending_join))
        .route("/auth/google", get(oauth::start))
        .route("/auth/google/callback", get(oauth::callback))
        .route("/auth/forgot-password", post(password_reset::forgot_password))
        .route("/auth/verify-reset-token", post(password_reset::verify_reset_token))
        .route("/auth/reset-password", post(password_reset::reset_password))
        .route("/public/{context_id}/dashboard", get(public::dashboard))
        .route("/public/contexts/{context_id}", get(public::context));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        // Contexts and membership
        .route("/contexts", post(contexts::create_context).get(contexts::list_contexts))
        .route("/contexts/join/{code}", post(contexts::join_by_code))
        .route("/contexts/{id}", get(contexts::get_context).patch(contexts::update_context))
        .route("/contexts/{id}/join", post(contexts::join_by_id))
        .route("/contexts/{id}/leave", post(contexts::leave_context))
        .route("/contexts/{id}/members", get(contexts::list_members))
        .route("/contexts/{id}/members/{user_id}/role", patch(contexts::update_member_role))
        .route("/contexts/{id}/members/{user_id}", delete(contexts::remove_member))
        .route("/contexts/{id}/regenerate-invite", post(contexts::regenerate_invite))
        // Projects
        .route(
            "/contexts/{id}/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{id}/members", get(projects::list_members).post(projects::add_member))
        .route("/projects/{id}/members/{user_id}", delete(projects::remove_member))
        // Posts
        .route(
            "/projects/{id}/posts",
            post(posts::create_post).get(posts::list_project_posts),
        )
        .route("/contexts/{id}/posts", get(posts::list_context_posts))
        .route(
            "/posts/{id}",
            get(posts::get_post).patch(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/{id}/approve", patch(posts::approve_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api", open_routes.merge(protected_routes))
        .with_state(state)
}
