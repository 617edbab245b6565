pub mod files;
pub mod health;
pub mod sign;
pub mod verify;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Routes served under `/api/v1`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(sign::router())
        .nest("/files", files::router())
        .nest("/verify", verify::router())
}
