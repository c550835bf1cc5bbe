use axum::{
    Json,
    extract::{Path, State},
};

use super::EnrollmentBody;
use crate::response::{ApiResult, ok};
use crate::state::AppState;

/// PUT /api/enrollments/{course_id}
///
/// Replaces the whole course roster.
///
/// ### Request Body
/// ```json
/// { "students": [ { "student_id": "u1", "student_name": "Ada" } ] }
/// ```
pub async fn replace_enrollment(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(body): Json<EnrollmentBody>,
) -> ApiResult {
    state
        .enrollment()
        .replace_enrollment(&course_id, &body.students)
        .await?;
    let count = body.students.len();
    Ok(ok(
        EnrollmentBody {
            students: body.students,
        },
        format!("Enrolled {count} students"),
    ))
}
