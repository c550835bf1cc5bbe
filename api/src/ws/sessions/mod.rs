use crate::state::AppState;
use axum::{Router, routing::get};

pub mod handlers;
pub mod topics;

use handlers::{lock_status_ws_handler, roster_ws_handler};

/// Read-only live views of one session.
pub fn ws_session_routes() -> Router<AppState> {
    Router::new()
        .route("/{schedule_id}/{date}/roster", get(roster_ws_handler))
        .route("/{schedule_id}/{date}/lock", get(lock_status_ws_handler))
}
