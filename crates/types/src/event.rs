//! Downstream event catalog pushed to the editor client, one JSON object per
//! SSE frame.

use serde::Serialize;
use serde_json::Value;

/// A normalized event emitted on `POST /ai/chat/stream`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownstreamEvent {
    /// Keepalive. Also sent once before any data.
    Ping,
    MessageStart {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Value>,
    },
    Error {
        message: String,
        #[serde(rename = "errorType", skip_serializing_if = "Option::is_none")]
        error_type: Option<String>,
    },
    /// A tool-use block opened; its arguments are about to stream.
    CodeStart { tool: String },
    /// Byte length of the tool arguments accumulated so far.
    CodeProgress { bytes: usize },
    CodeComplete { code: String, explanation: String },
    ThinkingStart,
    Thinking { content: String },
    ThinkingStop,
    Text { content: String },
    MessageDelta {
        #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Value>,
    },
    /// Terminal marker of a healthy stream.
    Done,
}

impl DownstreamEvent {
    /// Build an `error` event with an explicit error type.
    pub fn error(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            error_type: Some(error_type.into()),
        }
    }

    /// Render as a single SSE `data:` frame.
    #[must_use]
    pub fn to_sse_frame(&self) -> String {
        // Serializing this enum cannot fail: every payload is a string, an
        // integer, or an already-valid `Value`.
        let json = serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"ping"}"#.into());
        format!("data: {json}\n\n")
    }
}
