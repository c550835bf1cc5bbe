#[cfg(test)]
mod tests {
    use crate::helpers::ws::{next_json, WsClient};
    use crate::helpers::{connect_ws, make_test_app, send, spawn_server};
    use axum::http::{Method, StatusCode};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::protocol::Message;

    const SESSION: &str = "sessions/cs101_1/2025-01-15";
    const API: &str = "/api/sessions/cs101_1/2025-01-15";

    async fn expect_payload(ws: &mut WsClient, event: &str) -> Value {
        let frame = next_json(ws).await;
        assert_eq!(frame["type"], "event");
        assert_eq!(frame["event"], event);
        frame["payload"].clone()
    }

    #[tokio::test]
    async fn lock_stream_follows_unlock_and_lock() {
        let app = make_test_app();
        let addr = spawn_server(app.router()).await;
        let (mut ws, _) = connect_ws(&addr, &format!("{SESSION}/lock")).await.unwrap();

        let first = next_json(&mut ws).await;
        assert_eq!(first["topic"], "sessions:cs101_1_2025-01-15:lock");
        assert_eq!(first["payload"], true);
        assert_eq!(expect_payload(&mut ws, "session.lock_status").await, true);

        send(&app, Method::POST, &format!("{API}/unlock"), None).await;
        assert_eq!(expect_payload(&mut ws, "session.lock_status").await, false);

        send(&app, Method::POST, &format!("{API}/lock"), None).await;
        assert_eq!(expect_payload(&mut ws, "session.lock_status").await, true);
    }

    #[tokio::test]
    async fn roster_stream_pushes_sign_ins() {
        let app = make_test_app();
        let addr = spawn_server(app.router()).await;
        let (mut ws, _) = connect_ws(&addr, &format!("{SESSION}/roster")).await.unwrap();

        assert_eq!(expect_payload(&mut ws, "session.roster").await, json!([]));
        assert_eq!(expect_payload(&mut ws, "session.roster").await, json!([]));

        send(&app, Method::POST, &format!("{API}/unlock"), None).await;
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("{API}/sign-in"),
            Some(json!({ "student_id": "s1", "student_name": "Ada" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let roster = expect_payload(&mut ws, "session.roster").await;
        let roster = roster.as_array().unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0]["studentId"], "s1");
        assert_eq!(roster[0]["status"], "PRESENT");
    }

    #[tokio::test]
    async fn merged_roster_stream_lists_enrolled_students() {
        let app = make_test_app();
        send(
            &app,
            Method::PUT,
            "/api/enrollments/cs101",
            Some(json!({ "students": [
                { "student_id": "s1", "student_name": "Ada" },
                { "student_id": "s2", "student_name": "Bo" }
            ]})),
        )
        .await;
        let addr = spawn_server(app.router()).await;
        let (mut ws, _) = connect_ws(&addr, &format!("{SESSION}/roster?merged=true"))
            .await
            .unwrap();

        let _fallback = expect_payload(&mut ws, "session.roster").await;
        let live = expect_payload(&mut ws, "session.roster").await;
        let live = live.as_array().unwrap();
        assert_eq!(live.len(), 2);
        assert!(live.iter().all(|r| r["status"] == "ABSENT"));
    }

    #[tokio::test]
    async fn app_ping_gets_pong() {
        let app = make_test_app();
        let addr = spawn_server(app.router()).await;
        let (mut ws, _) = connect_ws(&addr, &format!("{SESSION}/lock")).await.unwrap();
        next_json(&mut ws).await;
        next_json(&mut ws).await;

        ws.send(Message::Text(json!({ "type": "ping" }).to_string().into()))
            .await
            .unwrap();
        let pong = next_json(&mut ws).await;
        assert_eq!(pong["event"], "pong");
        assert_eq!(pong["topic"], "sessions:cs101_1_2025-01-15:lock");
    }

    #[tokio::test]
    async fn invalid_session_key_is_rejected_before_upgrade() {
        let app = make_test_app();
        let addr = spawn_server(app.router()).await;
        let result = connect_ws(&addr, "sessions/cs101_1/tomorrow/lock").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn store_loss_sends_error_then_closes() {
        let app = make_test_app();
        let addr = spawn_server(app.router()).await;
        let (mut ws, _) = connect_ws(&addr, &format!("{SESSION}/roster")).await.unwrap();
        next_json(&mut ws).await;
        next_json(&mut ws).await;

        app.store.disconnect("network down");

        assert_eq!(expect_payload(&mut ws, "session.roster").await, json!([]));
        let err = expect_payload(&mut ws, "stream.error").await;
        assert!(err["message"].as_str().unwrap().contains("network down"));

        let closing = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap();
        assert!(matches!(closing, Some(Ok(Message::Close(_))) | None));
    }

    #[tokio::test]
    async fn closing_the_socket_releases_the_listener() {
        let app = make_test_app();
        let addr = spawn_server(app.router()).await;
        let (mut ws, _) = connect_ws(&addr, &format!("{SESSION}/lock")).await.unwrap();
        next_json(&mut ws).await;
        next_json(&mut ws).await;
        assert_eq!(app.store.listener_count(), 1);

        ws.close(None).await.unwrap();
        drop(ws);

        let mut released = false;
        for _ in 0..20 {
            if app.store.listener_count() == 0 {
                released = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(released);
    }
}
