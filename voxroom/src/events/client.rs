//! Frontend-to-backend client events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::AudioFormat;
use crate::error::{RealtimeError, Result};
use crate::message::ToolOutput;

/// Client event types accepted at the external boundary. Used to reject
/// unknown types loudly instead of silently mis-parsing them.
const KNOWN_TYPES: &[&str] = &[
    "client_session_create",
    "client_session_end",
    "client_response_create",
    "client_response_cancel",
    "client_text_append",
    "client_audio_append",
    "client_audio_commit",
    "client_image_append",
    "client_tool_result",
];

/// Events sent by a frontend into the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// The user creates a new session.
    #[serde(rename = "client_session_create")]
    SessionCreate {
        /// The requested session config.
        config: Value,
    },

    /// The user ends the current session.
    #[serde(rename = "client_session_end")]
    SessionEnd {
        /// The session id.
        session_id: String,
    },

    /// The user requests an immediate response.
    #[serde(rename = "client_response_create")]
    ResponseCreate {
        /// The session id.
        session_id: String,
    },

    /// The user interrupts the current response.
    #[serde(rename = "client_response_cancel")]
    ResponseCancel {
        /// The session id.
        session_id: String,
    },

    /// The user appends text input.
    #[serde(rename = "client_text_append")]
    TextAppend {
        /// The session id.
        session_id: String,
        /// The text input.
        text: String,
    },

    /// The user appends audio input.
    #[serde(rename = "client_audio_append")]
    AudioAppend {
        /// The session id.
        session_id: String,
        /// Base64-encoded audio.
        audio: String,
        /// The audio format.
        format: AudioFormat,
    },

    /// The user commits buffered audio to signal end of input.
    #[serde(rename = "client_audio_commit")]
    AudioCommit {
        /// The session id.
        session_id: String,
    },

    /// The user appends an image input.
    #[serde(rename = "client_image_append")]
    ImageAppend {
        /// The session id.
        session_id: String,
        /// Base64-encoded image.
        image: String,
        /// Image format information, e.g. `{"type": "image/jpeg"}`.
        format: Value,
    },

    /// A tool executed in the frontend reports its result.
    #[serde(rename = "client_tool_result")]
    ToolResult {
        /// The session id.
        session_id: String,
        /// The tool call id.
        id: String,
        /// The tool name.
        name: String,
        /// The tool output.
        output: ToolOutput,
    },
}

impl ClientEvent {
    /// Parse a client event from untyped JSON.
    ///
    /// This is the external contract boundary: a missing or unknown `type`
    /// is rejected with [`RealtimeError::UnknownEventType`] rather than
    /// dropped.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Some(event_type) = value.get("type").and_then(Value::as_str) else {
            return Err(RealtimeError::protocol(format!(
                "client event payload has no 'type' field: {}",
                value
            )));
        };

        if !KNOWN_TYPES.contains(&event_type) {
            return Err(RealtimeError::UnknownEventType(event_type.to_string()));
        }

        Ok(serde_json::from_value(value.clone())?)
    }
}
