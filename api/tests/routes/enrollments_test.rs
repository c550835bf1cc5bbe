#[cfg(test)]
mod tests {
    use crate::helpers::{make_test_app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn unknown_course_has_no_students() {
        let app = make_test_app();
        let (status, json) = send(&app, Method::GET, "/api/enrollments/cs999", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["students"], json!([]));
    }

    #[tokio::test]
    async fn put_replaces_the_whole_course() {
        let app = make_test_app();
        let first = json!({ "students": [
            { "student_id": "s1", "student_name": "Ada" },
            { "student_id": "s2", "student_name": "Bo" }
        ]});
        let (status, json) = send(&app, Method::PUT, "/api/enrollments/cs101", Some(first)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Enrolled 2 students");

        let second = json!({ "students": [ { "student_id": "s3", "student_name": "Cy" } ] });
        send(&app, Method::PUT, "/api/enrollments/cs101", Some(second)).await;

        let (_, json) = send(&app, Method::GET, "/api/enrollments/cs101", None).await;
        let students = json["data"]["students"].as_array().unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["student_id"], "s3");
        assert_eq!(students[0]["student_name"], "Cy");
    }

    #[tokio::test]
    async fn student_id_with_path_characters_is_rejected() {
        let app = make_test_app();
        let body = json!({ "students": [ { "student_id": "a.b", "student_name": "Ada" } ] });
        let (status, json) = send(&app, Method::PUT, "/api/enrollments/cs101", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }
}
