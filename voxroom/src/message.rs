//! Media blocks exchanged between agents and transports.
//!
//! A [`ContentBlock`] is the unit handed to a transport's outbound encoder:
//! audio, text, an image, or a tool result. Media payloads travel either
//! inline as base64 or by URL (dereferenced by the transport before
//! encoding).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a media payload lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSource {
    /// Inline base64-encoded payload.
    Base64 {
        /// MIME type of the payload, e.g. `"audio/pcm"` or `"image/jpeg"`.
        media_type: String,
        /// The base64 data.
        data: String,
    },
    /// Payload addressed by URL; fetched before encoding.
    Url {
        /// The payload URL.
        url: String,
    },
}

/// A unit of media sent into a realtime transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A chunk of audio.
    Audio {
        /// The audio payload.
        source: MediaSource,
    },
    /// A piece of user text.
    Text {
        /// The text content.
        text: String,
    },
    /// An image.
    Image {
        /// The image payload.
        source: MediaSource,
    },
    /// The result of a tool invocation, fed back to the model.
    ToolResult {
        /// The originating tool call id.
        id: String,
        /// The tool name.
        name: String,
        /// The tool output.
        output: ToolOutput,
    },
}

impl ContentBlock {
    /// The modality of this block.
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Audio { .. } => BlockKind::Audio,
            Self::Text { .. } => BlockKind::Text,
            Self::Image { .. } => BlockKind::Image,
            Self::ToolResult { .. } => BlockKind::ToolResult,
        }
    }
}

/// The modality of a [`ContentBlock`], used for transport capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Audio input.
    Audio,
    /// Text input.
    Text,
    /// Image input.
    Image,
    /// Tool result input.
    ToolResult,
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Image => "image",
            Self::ToolResult => "tool_result",
        };
        f.write_str(name)
    }
}

/// A tool call emitted by a realtime model.
///
/// While arguments are still streaming, `input` is an empty object and
/// `raw_input` holds the accumulated argument string; on the terminal event
/// `input` carries the parsed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    /// The call id assigned by the model.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// Parsed arguments (empty object until the call completes).
    pub input: Value,
    /// The raw argument string as received so far.
    pub raw_input: String,
}

/// The outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    /// The originating tool call id.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// The tool output.
    pub output: ToolOutput,
}

/// Tool output: plain text or structured JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    /// Plain text output.
    Text(String),
    /// Structured JSON output.
    Json(Value),
}

impl ToolOutput {
    /// The output rendered as one raw string, for vendors that accept tool
    /// results as text.
    pub fn as_raw_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Json(v) => v.to_string(),
        }
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for ToolOutput {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}
