use axum::extract::{Path, Query, State, WebSocketUpgrade};
use serde::Deserialize;
use services::enrollment::EnrollmentProvider;
use util::ws::serve::{WsServerOptions, serve_stream};

use super::topics::{LOCK_STATUS_EVENT, ROSTER_EVENT, lock_status_topic, roster_topic};
use crate::response::ApiResult;
use crate::routes::sessions::session_key;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RosterWsQuery {
    /// Stream the full class list, absent students included.
    pub merged: Option<bool>,
}

/// GET /ws/sessions/{schedule_id}/{date}/roster
///
/// Pushes `session.roster` events carrying the roster array: `[]` first, the
/// stored roster next, then every change. A store failure ends the socket
/// with a `stream.error` event and a close frame.
pub async fn roster_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
    Query(query): Query<RosterWsQuery>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let stream = if query.merged.unwrap_or(false) {
        let enrolled = state.enrollment().enrolled_students(key.course_id()).await?;
        state.publisher().merged_roster_stream(&key, enrolled)
    } else {
        state.publisher().roster_stream(&key)
    };

    let topic = roster_topic(&key);
    tracing::info!("Roster stream opened on '{topic}'");
    Ok(ws.on_upgrade(move |socket| {
        serve_stream(socket, topic, ROSTER_EVENT, stream, WsServerOptions::default())
    }))
}

/// GET /ws/sessions/{schedule_id}/{date}/lock
///
/// Pushes `session.lock_status` events carrying `isLocked`: `true` first and
/// `true` again whenever the value is missing.
pub async fn lock_status_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let stream = state.publisher().lock_status_stream(&key);

    let topic = lock_status_topic(&key);
    tracing::info!("Lock status stream opened on '{topic}'");
    Ok(ws.on_upgrade(move |socket| {
        serve_stream(socket, topic, LOCK_STATUS_EVENT, stream, WsServerOptions::default())
    }))
}
