use async_trait::async_trait;
use db::models::EnrolledStudent;
use db::models::enrollment::{course_path, encode_course, parse_course};
use db::realtime::RealtimeStore;
use std::sync::Arc;

use crate::error::AttendanceError;

/// Source of the students expected at a course's sessions.
#[async_trait]
pub trait EnrollmentProvider: Send + Sync + 'static {
    async fn enrolled_students(
        &self,
        course_id: &str,
    ) -> Result<Vec<EnrolledStudent>, AttendanceError>;
}

/// Enrollment kept in the realtime store under `enrollments/{courseId}`.
#[derive(Clone)]
pub struct StoreEnrollment {
    store: Arc<dyn RealtimeStore>,
}

impl StoreEnrollment {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Replace the course roster wholesale. An empty list removes it.
    pub async fn replace_enrollment(
        &self,
        course_id: &str,
        students: &[EnrolledStudent],
    ) -> Result<(), AttendanceError> {
        let path = course_path(course_id)?;
        for student in students {
            path.child(&student.student_id)?;
        }
        self.store.set(&path, encode_course(students)).await?;
        tracing::info!("Enrollment for {course_id} replaced with {} students", students.len());
        Ok(())
    }
}

#[async_trait]
impl EnrollmentProvider for StoreEnrollment {
    async fn enrolled_students(
        &self,
        course_id: &str,
    ) -> Result<Vec<EnrolledStudent>, AttendanceError> {
        let node = self.store.get(&course_path(course_id)?).await?;
        Ok(parse_course(node.as_ref()))
    }
}
