//! Inbound WebSocket message decoding.
//!
//! Accepted shapes, all carrying one frame:
//! - `{"event": "frame", "data": "<payload>"}`
//! - `["frame", "<payload>"]`
//! - a bare text payload (data URI or plain base64)
//! - a binary message holding the encoded image itself

use axum::extract::ws::Message;
use serde_json::Value;

use facestream_core::codec::domain::data_uri::FramePayload;
use facestream_core::shared::constants::EVENT_FRAME;

/// Frame carried by `message`, if any. Control frames, empty messages and
/// events other than `frame` yield `None`.
pub fn frame_payload(message: Message) -> Option<FramePayload> {
    match message {
        Message::Text(text) => parse_text(text),
        Message::Binary(bytes) if !bytes.is_empty() => Some(FramePayload::from(bytes)),
        _ => None,
    }
}

fn parse_text(text: String) -> Option<FramePayload> {
    if text.trim().is_empty() {
        return None;
    }
    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(_) => return Some(FramePayload::from(text)),
    };

    let (event, data) = match value {
        Value::String(s) => return Some(FramePayload::from(s)),
        Value::Object(mut map) => (map.remove("event"), map.remove("data")),
        Value::Array(items) => {
            let mut items = items.into_iter();
            (items.next(), items.next())
        }
        _ => return None,
    };

    match (event, data) {
        (Some(Value::String(event)), Some(Value::String(data))) if event == EVENT_FRAME => {
            Some(FramePayload::from(data))
        }
        (Some(Value::String(event)), _) if event != EVENT_FRAME => {
            log::debug!("Ignoring inbound event {event:?}");
            None
        }
        _ => {
            log::debug!("Ignoring malformed frame event");
            None
        }
    }
}
