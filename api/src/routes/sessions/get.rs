use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use services::enrollment::EnrollmentProvider;
use services::roster_publisher::merge_with_enrollment;

use super::common::{RosterQuery, SessionResponse, SignedInResponse, session_key};
use crate::response::{ApiResult, fail, ok};
use crate::state::AppState;

/// GET /api/sessions/{schedule_id}/{date}
///
/// Snapshot of the session including its roster.
///
/// ### Responses
/// - `200 OK` with the session
/// - `400 Bad Request` if the schedule id or date is malformed
/// - `404 Not Found` if the session was never written
pub async fn get_session(
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    match state.lifecycle().session(&key).await? {
        Some(session) => Ok(ok(SessionResponse::from(session), "Session retrieved")),
        None => Ok(fail(StatusCode::NOT_FOUND, "Session not found")),
    }
}

/// GET /api/sessions/{schedule_id}/{date}/students
///
/// Current roster. With `?merged=true` every student enrolled in the course is
/// listed and those without a record show as ABSENT.
pub async fn list_students(
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
    Query(query): Query<RosterQuery>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let mut roster = state.sign_in().roster(&key).await?;
    if query.merged.unwrap_or(false) {
        let enrolled = state.enrollment().enrolled_students(key.course_id()).await?;
        roster = merge_with_enrollment(&enrolled, roster);
    }
    Ok(ok(roster, "Roster retrieved"))
}

/// GET /api/sessions/{schedule_id}/{date}/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Path((schedule_id, date)): Path<(String, String)>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let summary = state.sign_in().summary(&key).await?;
    Ok(ok(summary, "Summary retrieved"))
}

/// GET /api/sessions/{schedule_id}/{date}/students/{student_id}
///
/// Whether the student has any record in this session.
pub async fn get_student(
    State(state): State<AppState>,
    Path((schedule_id, date, student_id)): Path<(String, String, String)>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let signed_in = state
        .sign_in()
        .has_student_signed_in(&key, &student_id)
        .await?;
    Ok(ok(SignedInResponse { signed_in }, "Sign-in status retrieved"))
}
