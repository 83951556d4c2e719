//! Vendor-neutral model events.
//!
//! Every transport adapter parses its vendor's wire frames into this one
//! vocabulary; the agent's outbound loop is the sole consumer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;
use crate::message::ToolUseBlock;

/// Everything a realtime model can emit, as a closed tagged union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelEvent {
    /// The realtime API session has been created.
    #[serde(rename = "model_session_created")]
    SessionCreated {
        /// The vendor session id.
        session_id: String,
    },

    /// The realtime API session has ended.
    #[serde(rename = "model_session_ended")]
    SessionEnded {
        /// The vendor session id.
        session_id: String,
        /// The reason the session ended.
        reason: String,
    },

    /// The model began generating a response.
    #[serde(rename = "model_response_created")]
    ResponseCreated {
        /// The response id.
        response_id: String,
    },

    /// The model finished generating a response.
    #[serde(rename = "model_response_done")]
    ResponseDone {
        /// The response id.
        response_id: String,
        /// Input token usage.
        input_tokens: u64,
        /// Output token usage.
        output_tokens: u64,
        /// Additional metadata.
        #[serde(default)]
        metadata: HashMap<String, String>,
    },

    /// A chunk of response audio.
    #[serde(rename = "model_response_audio_delta")]
    ResponseAudioDelta {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
        /// Base64-encoded audio chunk.
        delta: String,
        /// The audio format of the chunk.
        format: AudioFormat,
    },

    /// Response audio is complete.
    #[serde(rename = "model_response_audio_done")]
    ResponseAudioDone {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
    },

    /// A chunk of the response audio transcript.
    #[serde(rename = "model_response_audio_transcript_delta")]
    ResponseAudioTranscriptDelta {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
        /// The transcript chunk.
        delta: String,
    },

    /// The response audio transcript is complete.
    #[serde(rename = "model_response_audio_transcript_done")]
    ResponseAudioTranscriptDone {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
    },

    /// A streaming tool-call update; arguments accumulate in
    /// `tool_use.raw_input`.
    #[serde(rename = "model_response_tool_use_delta")]
    ResponseToolUseDelta {
        /// The response id.
        response_id: String,
        /// The response item id.
        item_id: String,
        /// The partial tool call.
        tool_use: ToolUseBlock,
    },

    /// A completed tool call with parsed arguments.
    #[serde(rename = "model_response_tool_use_done")]
    ResponseToolUseDone {
        /// The response id.
        response_id: String,
        /// The response item id.
        item_id: String,
        /// The complete tool call.
        tool_use: ToolUseBlock,
    },

    /// A chunk of the input-audio transcription.
    #[serde(rename = "model_input_transcription_delta")]
    InputTranscriptionDelta {
        /// The conversation item id.
        item_id: String,
        /// The transcription chunk.
        delta: String,
    },

    /// The input-audio transcription is complete.
    #[serde(rename = "model_input_transcription_done")]
    InputTranscriptionDone {
        /// The complete transcription.
        transcript: String,
        /// The conversation item id.
        item_id: String,
        /// Input token usage, when reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_tokens: Option<u64>,
        /// Output token usage, when reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_tokens: Option<u64>,
    },

    /// Voice activity detected: user input started.
    #[serde(rename = "model_input_started")]
    InputStarted {
        /// The conversation item id.
        item_id: String,
        /// Audio start offset in milliseconds.
        audio_start_ms: u64,
    },

    /// Voice activity detected: user input ended.
    #[serde(rename = "model_input_done")]
    InputDone {
        /// The conversation item id.
        item_id: String,
        /// Audio end offset in milliseconds.
        audio_end_ms: u64,
    },

    /// An error reported by the realtime model API.
    #[serde(rename = "model_error")]
    Error {
        /// The error type.
        error_type: String,
        /// The error code.
        code: String,
        /// The error message.
        message: String,
    },
}
