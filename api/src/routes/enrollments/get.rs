use axum::extract::{Path, State};
use services::enrollment::EnrollmentProvider;

use super::EnrollmentBody;
use crate::response::{ApiResult, ok};
use crate::state::AppState;

/// GET /api/enrollments/{course_id}
///
/// Students expected at the course's sessions. Unknown courses have none.
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult {
    let students = state.enrollment().enrolled_students(&course_id).await?;
    Ok(ok(EnrollmentBody { students }, "Enrollment retrieved"))
}
