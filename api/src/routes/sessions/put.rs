use axum::{
    Json,
    extract::{Path, State},
};
use services::attendance_record::StudentIdentity;

use super::common::{MarkAttendanceReq, MarkResponse, session_key};
use crate::response::{ApiResult, ok};
use crate::state::AppState;

/// PUT /api/sessions/{schedule_id}/{date}/students/{student_id}
///
/// Instructor override of one student's status; allowed whether or not the
/// session is locked.
///
/// ### Request Body
/// ```json
/// { "student_name": "Ada", "status": "EXCUSED" }
/// ```
///
/// ### Response
/// `first_mark` is `true` when this mark opened a session nobody unlocked.
/// ```json
/// { "success": true, "data": { "first_mark": true }, "message": "Marked EXCUSED" }
/// ```
pub async fn mark_student(
    State(state): State<AppState>,
    Path((schedule_id, date, student_id)): Path<(String, String, String)>,
    Json(req): Json<MarkAttendanceReq>,
) -> ApiResult {
    let key = session_key(&schedule_id, &date)?;
    let student = StudentIdentity {
        student_id,
        student_name: req.student_name,
        matric_number: req.matric_number,
        email: req.email,
    };
    let first_mark = state
        .sign_in()
        .mark_student_attendance(&key, &student, req.status)
        .await?;
    Ok(ok(MarkResponse { first_mark }, format!("Marked {}", req.status)))
}
