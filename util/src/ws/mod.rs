// util/src/ws/mod.rs
pub mod serve;

use chrono::Utc;
use serde::Serialize;

/// Standard event envelope sent over WebSocket topics.
#[derive(Serialize)]
pub struct EventEnvelope<'a, T> {
    #[serde(rename = "type")]
    pub r#type: &'static str,
    pub event: &'a str,
    pub topic: &'a str,
    pub payload: T,
    pub ts: String,
}

/// Serialize an `EventEnvelope` for `topic`. Returns `None` if the payload
/// cannot be represented as JSON.
pub fn encode_event<T: Serialize>(topic: &str, event: &str, payload: &T) -> Option<String> {
    let env = EventEnvelope {
        r#type: "event",
        event,
        topic,
        payload,
        ts: Utc::now().to_rfc3339(),
    };
    match serde_json::to_string(&env) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to encode '{event}' on '{topic}': {e}");
            None
        }
    }
}
