use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::realtime::{StoreError, StorePath};

/// Top-level collection of course rosters: `enrollments/{courseId}/{studentId}`.
pub const ENROLLMENTS_ROOT: &str = "enrollments";

const STUDENT_NAME: &str = "studentName";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledStudent {
    pub student_id: String,
    pub student_name: String,
}

impl EnrolledStudent {
    pub fn new(student_id: impl Into<String>, student_name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            student_name: student_name.into(),
        }
    }
}

pub fn course_path(course_id: &str) -> Result<StorePath, StoreError> {
    StorePath::root().child(ENROLLMENTS_ROOT)?.child(course_id)
}

/// Decode `enrollments/{courseId}`. A bare string entry is taken as the name.
pub fn parse_course(node: Option<&Value>) -> Vec<EnrolledStudent> {
    let Some(Value::Object(entries)) = node else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|(id, entry)| {
            let name = match entry {
                Value::String(s) => s.clone(),
                other => other
                    .get(STUDENT_NAME)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            EnrolledStudent::new(id.clone(), name)
        })
        .collect()
}

/// Encode a course roster for `enrollments/{courseId}`.
pub fn encode_course(students: &[EnrolledStudent]) -> Value {
    let map: Map<String, Value> = students
        .iter()
        .map(|s| (s.student_id.clone(), json!({ STUDENT_NAME: s.student_name })))
        .collect();
    Value::Object(map)
}
