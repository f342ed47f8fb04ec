//! Wire types at the socket and HTTP edge.
//!
//! - Client → Server: chat frames, either a JSON object or bare text
//! - Server → Client: [`MessageEvent`](crate::domain::chat::MessageEvent) JSON
//! - HTTP rejections: `{"error": "...", "code": "..."}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================
// Client → Server
// ============================================

#[derive(Debug, Deserialize)]
struct RawClientFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    temp_id: Option<Value>,
}

/// A chat message received from a client.
///
/// Web clients send `{"type": "message", "content": "...", "temp_id": ...}`.
/// Their `room_id` and `user_id` fields are ignored since both come from
/// the connection. Anything that is not a JSON object is taken as the
/// content verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientFrame {
    pub content: String,
    /// Client-side correlation id, echoed back in `data.temp_id`.
    pub temp_id: Option<Value>,
}

impl ClientFrame {
    /// Parses one text frame. `None` if there is nothing to relay.
    pub fn parse(text: &str) -> Option<Self> {
        let frame = match serde_json::from_str::<RawClientFrame>(text) {
            Ok(raw) => {
                if raw.kind.as_deref().is_some_and(|kind| kind != "message") {
                    return None;
                }
                Self {
                    content: raw.content.unwrap_or_default(),
                    temp_id: raw.temp_id.filter(|id| !id.is_null()),
                }
            }
            Err(_) => Self {
                content: text.to_string(),
                temp_id: None,
            },
        };

        if frame.content.trim().is_empty() {
            None
        } else {
            Some(frame)
        }
    }
}

// ============================================
// HTTP
// ============================================

/// Error body returned by the gateway and REST endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message, e.g. `"room not found"`.
    pub error: String,
    /// Stable code for programmatic handling, e.g. `"ROOM_NOT_FOUND"`.
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_web_client_message() {
        let frame = ClientFrame::parse(
            r#"{"type":"message","content":"hello","room_id":5,"user_id":9,"temp_id":"t-1"}"#,
        )
        .unwrap();

        assert_eq!(frame.content, "hello");
        assert_eq!(frame.temp_id, Some(json!("t-1")));
    }

    #[test]
    fn numeric_temp_id_is_kept() {
        let frame = ClientFrame::parse(r#"{"type":"message","content":"x","temp_id":1700000000}"#)
            .unwrap();
        assert_eq!(frame.temp_id, Some(json!(1700000000)));
    }

    #[test]
    fn missing_type_is_treated_as_message() {
        let frame = ClientFrame::parse(r#"{"content":"hi"}"#).unwrap();
        assert_eq!(frame.content, "hi");
        assert_eq!(frame.temp_id, None);
    }

    #[test]
    fn plain_text_is_content() {
        let frame = ClientFrame::parse("just words").unwrap();
        assert_eq!(frame.content, "just words");
    }

    #[test]
    fn json_that_is_not_an_object_is_content() {
        assert_eq!(ClientFrame::parse("42").unwrap().content, "42");
    }

    #[test]
    fn blank_content_is_dropped() {
        assert!(ClientFrame::parse("   ").is_none());
        assert!(ClientFrame::parse(r#"{"type":"message","content":"  "}"#).is_none());
        assert!(ClientFrame::parse(r#"{"type":"message"}"#).is_none());
    }

    #[test]
    fn other_frame_types_are_dropped() {
        assert!(ClientFrame::parse(r#"{"type":"typing","content":"x"}"#).is_none());
    }

    #[test]
    fn error_response_uses_fixed_field_names() {
        let body = serde_json::to_value(ErrorResponse::new("BAD_ROOM_ID", "bad room id")).unwrap();
        assert_eq!(body, json!({"error": "bad room id", "code": "BAD_ROOM_ID"}));
    }
}
