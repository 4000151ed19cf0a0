//! Frame decoding.
//!
//! Every failure stops here: a bad frame is logged and dropped. Unknown
//! `type`s still decode, as `NotificationEvent::Unrecognized`.

use serde_json::Value;
use taskwire_protocol::{NotificationEvent, ServerMessage};
use tracing::warn;

const PREVIEW_CHARS: usize = 240;

pub fn decode(raw: &str) -> Option<NotificationEvent> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            reject(raw, "invalid_json", &e.to_string());
            return None;
        }
    };

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        reject(raw, "missing_type", "frame has no string `type` field");
        return None;
    };

    if !ServerMessage::is_known_kind(kind) {
        return Some(NotificationEvent::Unrecognized {
            kind: kind.to_string(),
            payload: value,
        });
    }

    match serde_json::from_value::<ServerMessage>(value) {
        Ok(msg) => Some(msg.into()),
        Err(e) => {
            reject(raw, "schema_mismatch", &e.to_string());
            None
        }
    }
}

fn reject(raw: &str, reason: &str, error: &str) {
    warn!(
        component = "decoder",
        event = "ws.frame.decode_failed",
        reason,
        error,
        payload_bytes = raw.len(),
        payload_preview = %truncate_for_log(raw, PREVIEW_CHARS),
        "Dropping undecodable frame"
    );
}

fn truncate_for_log(raw: &str, max_chars: usize) -> String {
    let mut out: String = raw.chars().take(max_chars).collect();
    if raw.chars().count() > max_chars {
        out.push('…');
    }
    out
}
