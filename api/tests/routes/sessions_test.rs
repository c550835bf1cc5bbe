#[cfg(test)]
mod tests {
    use crate::helpers::{TestApp, make_test_app, send};
    use axum::http::{Method, StatusCode};
    use chrono::Duration;
    use serde_json::{Value, json};
    use serial_test::serial;
    use util::config::AppConfig;

    const BASE: &str = "/api/sessions/cs101_1/2025-01-15";

    fn url(suffix: &str) -> String {
        format!("{BASE}{suffix}")
    }

    fn ada() -> Value {
        json!({ "student_id": "s1", "student_name": "Ada", "matric_number": "A1" })
    }

    async fn enroll_three(app: &TestApp) {
        let body = json!({ "students": [
            { "student_id": "s1", "student_name": "Ada" },
            { "student_id": "s2", "student_name": "Bo" },
            { "student_id": "s3", "student_name": "Cy" }
        ]});
        let (status, _) = send(app, Method::PUT, "/api/enrollments/cs101", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_session_is_404() {
        let app = make_test_app();
        let (status, json) = send(&app, Method::GET, BASE, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Session not found");
    }

    #[tokio::test]
    async fn malformed_date_is_400() {
        let app = make_test_app();
        let (status, json) =
            send(&app, Method::POST, "/api/sessions/cs101_1/15-01-2025/unlock", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn unlock_reports_first_unlock_once() {
        let app = make_test_app();

        let (status, json) = send(&app, Method::POST, &url("/unlock"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["first_unlock"], true);

        app.clock.advance(Duration::minutes(1));
        let (_, json) = send(&app, Method::POST, &url("/unlock"), None).await;
        assert_eq!(json["data"]["first_unlock"], false);

        let (status, json) = send(&app, Method::GET, BASE, None).await;
        assert_eq!(status, StatusCode::OK);
        let session = &json["data"];
        assert_eq!(session["key"], "cs101_1_2025-01-15");
        assert_eq!(session["is_locked"], false);
        assert_eq!(session["is_active"], true);
        assert_eq!(session["unlock_count"], 2);
        assert_eq!(session["first_unlock_time"], "2025-01-15T09:00:00+00:00");
        assert_eq!(session["auto_lock_time"], "2025-01-15T09:21:00+00:00");
    }

    #[tokio::test]
    async fn sign_in_requires_an_unlocked_session() {
        let app = make_test_app();

        let (status, json) = send(&app, Method::POST, &url("/sign-in"), Some(ada())).await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(json["message"], "Session is locked");

        send(&app, Method::POST, &url("/unlock"), None).await;
        let (status, json) = send(&app, Method::POST, &url("/sign-in"), Some(ada())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        send(&app, Method::POST, &url("/lock"), None).await;
        let bo = json!({ "student_id": "s2", "student_name": "Bo" });
        let (status, _) = send(&app, Method::POST, &url("/sign-in"), Some(bo)).await;
        assert_eq!(status, StatusCode::LOCKED);

        let (_, json) = send(&app, Method::GET, &url("/students/s1"), None).await;
        assert_eq!(json["data"]["signed_in"], true);
        let (_, json) = send(&app, Method::GET, &url("/students/s2"), None).await;
        assert_eq!(json["data"]["signed_in"], false);
    }

    #[tokio::test]
    async fn roster_lists_present_students() {
        let app = make_test_app();
        send(&app, Method::POST, &url("/unlock"), None).await;
        send(&app, Method::POST, &url("/sign-in"), Some(ada())).await;

        let (status, json) = send(&app, Method::GET, &url("/students"), None).await;
        assert_eq!(status, StatusCode::OK);
        let roster = json["data"].as_array().unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0]["studentId"], "s1");
        assert_eq!(roster[0]["studentName"], "Ada");
        assert_eq!(roster[0]["matricNumber"], "A1");
        assert_eq!(roster[0]["status"], "PRESENT");
        assert_eq!(roster[0]["checkInTime"], "2025-01-15T09:00:00.000Z");
    }

    #[tokio::test]
    async fn merged_roster_includes_absent_enrolled_students() {
        let app = make_test_app();
        enroll_three(&app).await;
        send(&app, Method::POST, &url("/unlock"), None).await;
        send(&app, Method::POST, &url("/sign-in"), Some(ada())).await;

        let (_, json) = send(&app, Method::GET, &url("/students?merged=true"), None).await;
        let roster = json["data"].as_array().unwrap();
        let statuses: Vec<(&str, &str)> = roster
            .iter()
            .map(|r| (r["studentId"].as_str().unwrap(), r["status"].as_str().unwrap()))
            .collect();
        assert_eq!(
            statuses,
            vec![("s1", "PRESENT"), ("s2", "ABSENT"), ("s3", "ABSENT")]
        );

        // nothing was written for the placeholders
        let (_, json) = send(&app, Method::GET, &url("/summary"), None).await;
        assert_eq!(json["data"]["total"], 1);
    }

    #[tokio::test]
    async fn manual_mark_works_on_locked_sessions() {
        let app = make_test_app();
        send(&app, Method::POST, &url("/unlock"), None).await;
        send(&app, Method::POST, &url("/lock"), None).await;

        let body = json!({ "student_name": "Bo", "status": "EXCUSED" });
        let (status, json) = send(&app, Method::PUT, &url("/students/s2"), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Marked EXCUSED");
        assert_eq!(json["data"]["first_mark"], false);

        let (_, json) = send(&app, Method::GET, &url("/students"), None).await;
        let roster = json["data"].as_array().unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0]["status"], "EXCUSED");
        assert_eq!(roster[0]["manuallyMarked"], true);
    }

    #[tokio::test]
    async fn first_mark_on_unopened_session_starts_the_class() {
        let app = make_test_app();
        let body = json!({ "student_name": "Ada", "status": "PRESENT" });
        let (status, json) = send(&app, Method::PUT, &url("/students/s1"), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["first_mark"], true);

        let (_, json) = send(&app, Method::GET, BASE, None).await;
        let session = &json["data"];
        assert_eq!(session["is_locked"], true);
        assert_eq!(session["manual_mark_session"], true);
        assert_eq!(session["start_time"], "2025-01-15T09:00:00+00:00");
        assert_eq!(session["first_unlock_time"], "2025-01-15T09:00:00+00:00");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let app = make_test_app();
        let body = json!({ "student_name": "Bo", "status": "present" });
        let (status, _) = send(&app, Method::PUT, &url("/students/s2"), Some(body)).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn lock_can_mark_absentees() {
        let app = make_test_app();
        enroll_three(&app).await;
        send(&app, Method::POST, &url("/unlock"), None).await;
        send(&app, Method::POST, &url("/sign-in"), Some(ada())).await;

        let (status, json) =
            send(&app, Method::POST, &url("/lock?mark_absent=true"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["marked_absent"], 2);

        let (_, json) = send(&app, Method::GET, &url("/summary"), None).await;
        assert_eq!(json["data"]["present"], 1);
        assert_eq!(json["data"]["absent"], 2);
        assert_eq!(json["data"]["total"], 3);

        let (_, json) = send(&app, Method::GET, BASE, None).await;
        assert_eq!(json["data"]["is_locked"], true);
        assert_eq!(json["data"]["is_active"], false);
    }

    #[tokio::test]
    async fn auto_lock_fires_only_after_the_deadline() {
        let app = make_test_app();
        enroll_three(&app).await;
        send(&app, Method::POST, &url("/unlock"), None).await;
        send(&app, Method::POST, &url("/sign-in"), Some(ada())).await;

        app.clock.advance(Duration::minutes(19));
        let (status, json) = send(&app, Method::POST, &url("/auto-lock"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["locked"], false);
        assert_eq!(json["message"], "Auto-lock not due");

        app.clock.advance(Duration::minutes(2));
        let (_, json) = send(&app, Method::POST, &url("/auto-lock"), None).await;
        assert_eq!(json["data"]["locked"], true);
        let (_, json) = send(&app, Method::POST, &url("/auto-lock"), None).await;
        assert_eq!(json["data"]["locked"], false);

        let (_, json) = send(&app, Method::GET, BASE, None).await;
        assert_eq!(json["data"]["is_locked"], true);
        assert_eq!(json["data"]["auto_locked_at"], "2025-01-15T09:21:00+00:00");
        assert_eq!(json["data"]["roster"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cleanup_removes_old_sessions() {
        let app = make_test_app();
        send(&app, Method::POST, &url("/unlock"), None).await;

        app.clock.advance(Duration::days(8));
        let (status, json) =
            send(&app, Method::POST, "/api/sessions/cleanup?days=7", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["removed"], 1);

        let (status, _) = send(&app, Method::GET, BASE, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn cleanup_defaults_to_configured_retention() {
        AppConfig::set_retention_days(2);
        let app = make_test_app();
        send(&app, Method::POST, &url("/unlock"), None).await;

        app.clock.advance(Duration::days(1));
        let (_, json) = send(&app, Method::POST, "/api/sessions/cleanup", None).await;
        assert_eq!(json["data"]["removed"], 0);

        app.clock.advance(Duration::days(2));
        let (_, json) = send(&app, Method::POST, "/api/sessions/cleanup", None).await;
        assert_eq!(json["data"]["removed"], 1);

        AppConfig::reset();
    }

    #[tokio::test]
    async fn offline_store_is_503() {
        let app = make_test_app();
        app.store.disconnect("network down");

        let (status, json) = send(&app, Method::POST, &url("/unlock"), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["success"], false);
    }
}
