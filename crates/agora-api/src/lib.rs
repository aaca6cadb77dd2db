pub mod auth;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod posts;
pub mod state;
pub mod views;
pub mod votes;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
};

use crate::middleware::{optional_auth, require_auth};
use crate::state::AppState;

/// All API routes with their auth layers applied.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password));

    let viewer_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}", put(posts::update_post).delete(posts::delete_post))
        .route("/posts/{post_id}/vote", post(votes::cast_vote))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
