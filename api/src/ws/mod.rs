use crate::state::AppState;
use crate::ws::sessions::ws_session_routes;
use axum::Router;

pub mod sessions;

/// Builds every WebSocket route under `/ws`.
pub fn ws_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/sessions", ws_session_routes())
        .with_state(app_state)
}
