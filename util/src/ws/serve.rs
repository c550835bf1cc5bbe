use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use bytes::Bytes;
use chrono::Utc;
use futures::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use tokio::{sync::mpsc, time};

use super::encode_event;

/// Event name used for the terminal frame when the source stream fails.
pub const STREAM_ERROR_EVENT: &str = "stream.error";

pub struct WsServerOptions {
    pub ws_ping_sec: u64,
    pub enable_app_ping: bool,
}

impl Default for WsServerOptions {
    fn default() -> Self {
        Self {
            ws_ping_sec: 30,
            enable_app_ping: true,
        }
    }
}

#[derive(Serialize)]
struct StreamErrorPayload {
    message: String,
}

/// Pump a fallible value stream into one client socket.
///
/// Every `Ok` item is sent as an `event` envelope on `topic`. The first `Err`
/// is sent as a `stream.error` envelope followed by a close frame, after which
/// nothing else is forwarded. The stream is dropped as soon as the client goes
/// away, which releases whatever listener backs it.
pub async fn serve_stream<S, T, E>(
    socket: WebSocket,
    topic: String,
    event: &'static str,
    stream: S,
    opts: WsServerOptions,
) where
    S: Stream<Item = Result<T, E>> + Send + Unpin + 'static,
    T: Serialize + Send + 'static,
    E: Display + Send + 'static,
{
    let (mut sink, mut socket_rx) = socket.split();

    // Outbound queue and writer task
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(64);
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let closing = matches!(frame, Message::Close(_));
            if sink.send(frame).await.is_err() || closing {
                break;
            }
        }
    });

    // S→C: forward stream values
    let forward_task = {
        let out_tx = out_tx.clone();
        let topic = topic.clone();
        let mut stream = stream;
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(value) => {
                        let Some(text) = encode_event(&topic, event, &value) else {
                            continue;
                        };
                        if out_tx.send(Message::Text(text.into())).await.is_err() {
                            tracing::info!("Client disconnected while sending to '{topic}'");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Stream on '{topic}' terminated: {e}");
                        let payload = StreamErrorPayload {
                            message: e.to_string(),
                        };
                        if let Some(text) = encode_event(&topic, STREAM_ERROR_EVENT, &payload) {
                            let _ = out_tx.send(Message::Text(text.into())).await;
                        }
                        break;
                    }
                }
            }
            let _ = out_tx
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::AWAY,
                    reason: "stream ended".into(),
                })))
                .await;
        })
    };

    // WS-level periodic ping
    let ping_task = {
        let out_tx = out_tx.clone();
        let every = opts.ws_ping_sec.max(1);
        tokio::spawn(async move {
            loop {
                time::sleep(std::time::Duration::from_secs(every)).await;
                if out_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        })
    };

    // C→S: only pings are meaningful on these read-only topics
    while let Some(Ok(msg)) = socket_rx.next().await {
        match msg {
            Message::Text(text) => {
                if opts.enable_app_ping && is_app_ping(text.as_str()) {
                    let pong = serde_json::json!({
                        "event": "pong",
                        "topic": topic,
                        "payload": {},
                        "ts": Utc::now().to_rfc3339(),
                    });
                    let _ = out_tx.send(Message::Text(pong.to_string().into())).await;
                } else {
                    tracing::debug!("Ignoring client message on read-only topic '{topic}'");
                }
            }
            Message::Ping(payload) => {
                let _ = out_tx.send(Message::Pong(payload)).await;
            }
            Message::Pong(_) => {}
            Message::Binary(_) => {
                tracing::warn!("Ignoring binary on topic '{topic}'");
            }
            Message::Close(_) => break,
        }
    }

    forward_task.abort();
    ping_task.abort();
    drop(out_tx);
    let _ = writer_task.await;
    tracing::info!("WS session ended for topic '{topic}'");
}

fn is_app_ping(raw: &str) -> bool {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        if let Some(Value::String(t)) = map.get("type") {
            return t == "ping";
        }
    }
    false
}
