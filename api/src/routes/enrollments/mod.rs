use crate::state::AppState;
use axum::{Router, routing::get};
use db::models::EnrolledStudent;
use serde::{Deserialize, Serialize};

mod get;
mod put;

pub use get::get_enrollment;
pub use put::replace_enrollment;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EnrollmentBody {
    pub students: Vec<EnrolledStudent>,
}

/// Builds the `/enrollments` route group.
pub fn enrollment_routes() -> Router<AppState> {
    Router::new().route("/{course_id}", get(get_enrollment).put(replace_enrollment))
}
