//! Backend-to-frontend server events.
//!
//! Server events are the model-event vocabulary projected outward: the same
//! payload fields with an `agent_` type prefix plus the emitting agent's
//! identity, alongside a few backend-only lifecycle events.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;
use crate::events::model::ModelEvent;
use crate::message::{ToolResultBlock, ToolUseBlock};

/// Events sent by the backend to the frontend (and rebroadcast to other
/// agents in a room).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// The frontend-backend session was created.
    #[serde(rename = "server_session_created")]
    SessionCreated {
        /// The session id.
        session_id: String,
    },

    /// The frontend-backend session was updated.
    #[serde(rename = "server_session_updated")]
    SessionUpdated {
        /// The session id.
        session_id: String,
    },

    /// The frontend-backend session has ended.
    #[serde(rename = "server_session_ended")]
    SessionEnded {
        /// The session id.
        session_id: String,
    },

    /// The agent is connected and ready to receive input.
    #[serde(rename = "agent_ready")]
    AgentReady {
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// The agent's session ended.
    #[serde(rename = "agent_ended")]
    AgentEnded {
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// The agent started generating a response.
    #[serde(rename = "agent_response_created")]
    ResponseCreated {
        /// The response id.
        response_id: String,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// The agent finished generating a response.
    #[serde(rename = "agent_response_done")]
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
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// A chunk of the agent's response audio.
    #[serde(rename = "agent_response_audio_delta")]
    ResponseAudioDelta {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
        /// Base64-encoded audio chunk.
        delta: String,
        /// The audio format of the chunk.
        format: AudioFormat,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// The agent's response audio is complete.
    #[serde(rename = "agent_response_audio_done")]
    ResponseAudioDone {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// A chunk of the agent's response transcript.
    #[serde(rename = "agent_response_audio_transcript_delta")]
    ResponseAudioTranscriptDelta {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
        /// The transcript chunk.
        delta: String,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// The agent's response transcript is complete.
    #[serde(rename = "agent_response_audio_transcript_done")]
    ResponseAudioTranscriptDone {
        /// The response id.
        response_id: String,
        /// The conversation item id.
        item_id: String,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// A streaming tool-call update from the agent.
    #[serde(rename = "agent_response_tool_use_delta")]
    ResponseToolUseDelta {
        /// The response id.
        response_id: String,
        /// The response item id.
        item_id: String,
        /// The partial tool call.
        tool_use: ToolUseBlock,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// A completed tool call from the agent.
    #[serde(rename = "agent_response_tool_use_done")]
    ResponseToolUseDone {
        /// The response id.
        response_id: String,
        /// The response item id.
        item_id: String,
        /// The complete tool call.
        tool_use: ToolUseBlock,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// The result of a tool invocation.
    #[serde(rename = "agent_response_tool_result")]
    ResponseToolResult {
        /// The tool result.
        tool_result: ToolResultBlock,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// A chunk of the user-input transcription.
    #[serde(rename = "agent_input_transcription_delta")]
    InputTranscriptionDelta {
        /// The conversation item id.
        item_id: String,
        /// The transcription chunk.
        delta: String,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// The user-input transcription is complete.
    #[serde(rename = "agent_input_transcription_done")]
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
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// Voice activity detected: user input started.
    #[serde(rename = "agent_input_started")]
    InputStarted {
        /// The conversation item id.
        item_id: String,
        /// Audio start offset in milliseconds.
        audio_start_ms: u64,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// Voice activity detected: user input ended.
    #[serde(rename = "agent_input_done")]
    InputDone {
        /// The conversation item id.
        item_id: String,
        /// Audio end offset in milliseconds.
        audio_end_ms: u64,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },

    /// An error in the backend or agent.
    #[serde(rename = "agent_error")]
    Error {
        /// The error type.
        error_type: String,
        /// The error code.
        code: String,
        /// The error message.
        message: String,
        /// The agent id.
        agent_id: String,
        /// The agent display name.
        agent_name: String,
    },
}

impl ServerEvent {
    /// The id of the agent that emitted this event, or `None` for the
    /// session-level events. Chat-room self-exclusion keys on this.
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Self::SessionCreated { .. } | Self::SessionUpdated { .. } | Self::SessionEnded { .. } => {
                None
            }
            Self::AgentReady { agent_id, .. }
            | Self::AgentEnded { agent_id, .. }
            | Self::ResponseCreated { agent_id, .. }
            | Self::ResponseDone { agent_id, .. }
            | Self::ResponseAudioDelta { agent_id, .. }
            | Self::ResponseAudioDone { agent_id, .. }
            | Self::ResponseAudioTranscriptDelta { agent_id, .. }
            | Self::ResponseAudioTranscriptDone { agent_id, .. }
            | Self::ResponseToolUseDelta { agent_id, .. }
            | Self::ResponseToolUseDone { agent_id, .. }
            | Self::ResponseToolResult { agent_id, .. }
            | Self::InputTranscriptionDelta { agent_id, .. }
            | Self::InputTranscriptionDone { agent_id, .. }
            | Self::InputStarted { agent_id, .. }
            | Self::InputDone { agent_id, .. }
            | Self::Error { agent_id, .. } => Some(agent_id),
        }
    }

    /// Project a [`ModelEvent`] into a [`ServerEvent`].
    ///
    /// The conversion is mechanical: every payload field carries over under
    /// the same name, the type discriminator is rewritten from `model_*` to
    /// `agent_*`, and the agent identity is injected. The two session
    /// lifecycle events become `agent_ready` / `agent_ended`.
    pub fn from_model(event: ModelEvent, agent_id: &str, agent_name: &str) -> Self {
        let agent_id = agent_id.to_string();
        let agent_name = agent_name.to_string();
        match event {
            ModelEvent::SessionCreated { .. } => Self::AgentReady { agent_id, agent_name },
            ModelEvent::SessionEnded { .. } => Self::AgentEnded { agent_id, agent_name },
            ModelEvent::ResponseCreated { response_id } => {
                Self::ResponseCreated { response_id, agent_id, agent_name }
            }
            ModelEvent::ResponseDone { response_id, input_tokens, output_tokens, metadata } => {
                Self::ResponseDone {
                    response_id,
                    input_tokens,
                    output_tokens,
                    metadata,
                    agent_id,
                    agent_name,
                }
            }
            ModelEvent::ResponseAudioDelta { response_id, item_id, delta, format } => {
                Self::ResponseAudioDelta { response_id, item_id, delta, format, agent_id, agent_name }
            }
            ModelEvent::ResponseAudioDone { response_id, item_id } => {
                Self::ResponseAudioDone { response_id, item_id, agent_id, agent_name }
            }
            ModelEvent::ResponseAudioTranscriptDelta { response_id, item_id, delta } => {
                Self::ResponseAudioTranscriptDelta {
                    response_id,
                    item_id,
                    delta,
                    agent_id,
                    agent_name,
                }
            }
            ModelEvent::ResponseAudioTranscriptDone { response_id, item_id } => {
                Self::ResponseAudioTranscriptDone { response_id, item_id, agent_id, agent_name }
            }
            ModelEvent::ResponseToolUseDelta { response_id, item_id, tool_use } => {
                Self::ResponseToolUseDelta { response_id, item_id, tool_use, agent_id, agent_name }
            }
            ModelEvent::ResponseToolUseDone { response_id, item_id, tool_use } => {
                Self::ResponseToolUseDone { response_id, item_id, tool_use, agent_id, agent_name }
            }
            ModelEvent::InputTranscriptionDelta { item_id, delta } => {
                Self::InputTranscriptionDelta { item_id, delta, agent_id, agent_name }
            }
            ModelEvent::InputTranscriptionDone {
                transcript,
                item_id,
                input_tokens,
                output_tokens,
            } => Self::InputTranscriptionDone {
                transcript,
                item_id,
                input_tokens,
                output_tokens,
                agent_id,
                agent_name,
            },
            ModelEvent::InputStarted { item_id, audio_start_ms } => {
                Self::InputStarted { item_id, audio_start_ms, agent_id, agent_name }
            }
            ModelEvent::InputDone { item_id, audio_end_ms } => {
                Self::InputDone { item_id, audio_end_ms, agent_id, agent_name }
            }
            ModelEvent::Error { error_type, code, message } => {
                Self::Error { error_type, code, message, agent_id, agent_name }
            }
        }
    }
}
