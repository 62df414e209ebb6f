//! services/dashboard/src/web/auth.rs
//!
//! Sign-out endpoint. Signing in happens against the hosted platform's
//! authentication service, outside this process.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{error, info};

use crate::web::state::AppState;

/// POST /auth/logout - Sign out and forget all client state
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 500, description = "The session could not be cleared")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let result = state.store.sign_out().await;
    state.projects.clear();

    match result {
        Ok(()) => {
            info!("Signed out; client state cleared");
            Ok(StatusCode::OK)
        }
        Err(e) => {
            error!("Failed to sign out: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string()))
        }
    }
}
