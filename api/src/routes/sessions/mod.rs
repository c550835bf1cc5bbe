use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

mod common;
mod get;
mod post;
mod put;

pub use common::session_key;
pub use get::{get_session, get_student, get_summary, list_students};
pub use post::{auto_lock_session, cleanup_sessions, lock_session, sign_in, unlock_session};
pub use put::mark_student;

/// Builds the `/sessions` route group.
///
/// A session is addressed by its schedule id and `YYYY-MM-DD` date.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/cleanup", post(cleanup_sessions))
        .route("/{schedule_id}/{date}", get(get_session))
        .route("/{schedule_id}/{date}/unlock", post(unlock_session))
        .route("/{schedule_id}/{date}/lock", post(lock_session))
        .route("/{schedule_id}/{date}/auto-lock", post(auto_lock_session))
        .route("/{schedule_id}/{date}/sign-in", post(sign_in))
        .route("/{schedule_id}/{date}/summary", get(get_summary))
        .route("/{schedule_id}/{date}/students", get(list_students))
        .route(
            "/{schedule_id}/{date}/students/{student_id}",
            get(get_student).put(mark_student),
        )
}
