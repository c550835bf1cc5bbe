//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness check
//! - `/sessions` → session lifecycle, sign-in and roster reads
//! - `/enrollments` → course enrollment used for absence marking

use crate::routes::{
    enrollments::enrollment_routes, health::health_routes, sessions::session_routes,
};
use crate::state::AppState;
use axum::Router;

pub mod enrollments;
pub mod health;
pub mod sessions;

/// Builds the router for every HTTP endpoint under `/api`.
pub fn routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/sessions", session_routes())
        .nest("/enrollments", enrollment_routes())
        .with_state(app_state)
}
