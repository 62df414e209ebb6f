pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

pub use middleware::require_auth;
pub use ws_handler::ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use state::AppState;

/// Builds the surface API: the public logout route plus every route that
/// needs a signed-in user.
pub fn router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/auth/logout", post(auth::logout_handler));

    let protected_routes = Router::new()
        .route("/timer", get(rest::get_timer_handler))
        .route("/timer/start", post(rest::start_timer_handler))
        .route("/timer/stop", post(rest::stop_timer_handler))
        .route("/timer/refresh", post(rest::refresh_timer_handler))
        .route("/timer/pause", post(rest::toggle_pause_handler))
        .route("/time-entries/manual", post(rest::add_manual_entry_handler))
        .route("/tasks", get(rest::list_tasks_handler))
        .route("/projects", get(rest::list_projects_handler))
        .route("/caches/refresh", post(rest::refresh_caches_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
