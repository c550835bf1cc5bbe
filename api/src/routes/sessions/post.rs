use axum::{
    Json,
    extract::{Path, Query, State},
};
use services::attendance_record::StudentIdentity;
use services::enrollment::EnrollmentProvider;
use util::config;

use super::common::{
    AutoLockResponse, CleanupQuery, CleanupResponse, LockQuery, LockResponse, SignInReq,
    UnlockResponse, session_key,
};
use crate::response::{ApiResult, ok};
use crate::state::AppState;

/// POST /api/sessions/{schedule_id}/{date}/unlock
///
/// Opens the session for sign-in and re-arms its auto-lock deadline.
///
/// ### Response
/// ```json
/// { "success": true, "data": { "first_unlock": true }, "message": "Session unlocked" }
/// ```
pub async fn unlock_session(
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let first_unlock = state.lifecycle().unlock(&key).await?;
    Ok(ok(UnlockResponse { first_unlock }, "Session unlocked"))
}

/// POST /api/sessions/{schedule_id}/{date}/lock
///
/// Closes the session. With `?mark_absent=true`, enrolled students with no
/// record are written as ABSENT first (only if the session was ever unlocked).
pub async fn lock_session(
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
    Query(query): Query<LockQuery>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let marked_absent = if query.mark_absent.unwrap_or(false) {
        let enrolled = state.enrollment().enrolled_students(key.course_id()).await?;
        state.lifecycle().lock_and_mark_absent(&key, &enrolled).await?
    } else {
        state.lifecycle().lock(&key).await?;
        0
    };
    Ok(ok(LockResponse { marked_absent }, "Session locked"))
}

/// POST /api/sessions/{schedule_id}/{date}/auto-lock
///
/// Locks the session if its auto-lock deadline has passed. `locked` is `true`
/// only for the call that performed the transition.
pub async fn auto_lock_session(
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let enrolled = state.enrollment().enrolled_students(key.course_id()).await?;
    let locked = state.lifecycle().check_and_auto_lock(&key, &enrolled).await?;
    let message = if locked {
        "Session auto-locked"
    } else {
        "Auto-lock not due"
    };
    Ok(ok(AutoLockResponse { locked }, message))
}

/// POST /api/sessions/{schedule_id}/{date}/sign-in
///
/// ### Request Body
/// ```json
/// { "student_id": "u123", "student_name": "Ada", "matric_number": "A1", "email": "ada@uni.edu" }
/// ```
///
/// ### Responses
/// - `200 OK` once the PRESENT record is written
/// - `423 Locked` with message `"Session is locked"` when the session is locked or missing
pub async fn sign_in(
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
    Json(req): Json<SignInReq>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let student = StudentIdentity {
        student_id: req.student_id,
        student_name: req.student_name,
        matric_number: req.matric_number,
        email: req.email,
    };
    state.sign_in().sign_in(&key, &student).await?;
    Ok(ok((), "Signed in"))
}

/// POST /api/sessions/cleanup
///
/// Deletes sessions started more than `days` days ago (default from
/// `RETENTION_DAYS`).
pub async fn cleanup_sessions(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> ApiResult {
    let days = query.days.unwrap_or_else(config::retention_days);
    let removed = state.lifecycle().cleanup_expired_sessions(days).await?;
    Ok(ok(CleanupResponse { removed }, "Expired sessions removed"))
}
