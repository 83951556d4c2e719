//! OpenAI Realtime API transport adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tracing::{debug, warn};

use crate::audio::AudioFormat;
use crate::error::{RealtimeError, Result};
use crate::events::ModelEvent;
use crate::message::{BlockKind, ContentBlock, ToolUseBlock};
use crate::transport::json::{loads_with_repair, parse_frame, str_field, u64_field};
use crate::transport::{TransportAdapter, source_data};

/// OpenAI Realtime API WebSocket URL.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default model for OpenAI Realtime.
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";

/// Default voice for OpenAI Realtime.
pub const DEFAULT_VOICE: &str = "alloy";

const SUPPORTED_INPUT: &[BlockKind] = &[BlockKind::Audio, BlockKind::Text, BlockKind::ToolResult];

/// Per-response correlation state, owned by the receive pump.
#[derive(Default)]
struct ParseState {
    response_id: String,
    /// Streamed tool-call arguments keyed by call id; an entry lives from
    /// the first argument delta until the matching done frame.
    tool_args: HashMap<String, String>,
}

/// Adapter for the OpenAI Realtime API (24 kHz PCM in and out, tools
/// supported).
pub struct OpenAIRealtimeAdapter {
    model_name: String,
    api_key: String,
    voice: String,
    input_transcription: bool,
    state: Mutex<ParseState>,
}

impl OpenAIRealtimeAdapter {
    /// Create an adapter for the given model and API key.
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            api_key: api_key.into(),
            voice: DEFAULT_VOICE.to_string(),
            input_transcription: true,
            state: Mutex::new(ParseState::default()),
        }
    }

    /// Set the text-to-speech voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Enable or disable input-audio transcription.
    pub fn with_input_transcription(mut self, enabled: bool) -> Self {
        self.input_transcription = enabled;
        self
    }

    /// Flatten chat-style tool schemas into the Realtime API shape: the
    /// function definition lifted to the top level with an added
    /// `"type": "function"` field.
    fn format_tool_schemas(schemas: &[Value]) -> Vec<Value> {
        schemas
            .iter()
            .filter_map(|schema| schema.get("function").and_then(Value::as_object))
            .map(|function| {
                let mut tool = serde_json::Map::new();
                tool.insert("type".to_string(), json!("function"));
                for (key, value) in function {
                    tool.insert(key.clone(), value.clone());
                }
                Value::Object(tool)
            })
            .collect()
    }
}

#[async_trait]
impl TransportAdapter for OpenAIRealtimeAdapter {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn input_sample_rate(&self) -> u32 {
        24_000
    }

    fn output_sample_rate(&self) -> u32 {
        24_000
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn supported_input(&self) -> &[BlockKind] {
        SUPPORTED_INPUT
    }

    fn connect_request(&self) -> Result<Request> {
        let url = format!("{}?model={}", OPENAI_REALTIME_URL, self.model_name);
        let mut request = url
            .into_client_request()
            .map_err(|e| RealtimeError::connection(format!("invalid request: {}", e)))?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| RealtimeError::config(format!("invalid API key header: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, auth);
        request.headers_mut().insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));
        Ok(request)
    }

    fn build_session_config(&self, instructions: &str, tools: Option<&[Value]>) -> Value {
        let mut session = json!({
            "type": "realtime",
            "output_modalities": ["audio"],
            "audio": {
                "input": {
                    "turn_detection": {
                        "type": "server_vad",
                        "create_response": true,
                    },
                },
                "output": {
                    "voice": self.voice,
                },
            },
            "instructions": instructions,
        });

        if self.input_transcription {
            session["audio"]["input"]["transcription"] = json!({"model": "whisper-1"});
        }

        if let Some(tools) = tools {
            if !tools.is_empty() {
                session["tools"] = Value::Array(Self::format_tool_schemas(tools));
            }
        }

        json!({
            "type": "session.update",
            "session": session,
        })
    }

    async fn encode_outbound(&self, block: &ContentBlock) -> Result<Option<String>> {
        if !SUPPORTED_INPUT.contains(&block.kind()) {
            warn!(
                kind = %block.kind(),
                "OpenAI Realtime API does not accept this input modality, dropping"
            );
            return Ok(None);
        }

        let message = match block {
            ContentBlock::Audio { source } => json!({
                "type": "input_audio_buffer.append",
                "audio": source_data(source).await?,
            }),
            ContentBlock::Text { text } => json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "message",
                    "role": "user",
                    "content": [{"type": "input_text", "text": text}],
                },
            }),
            ContentBlock::ToolResult { id, output, .. } => json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "function_call_output",
                    "call_id": id,
                    "output": output.as_raw_string(),
                },
            }),
            ContentBlock::Image { .. } => return Ok(None),
        };

        Ok(Some(message.to_string()))
    }

    fn parse_inbound(&self, raw: &str) -> Vec<ModelEvent> {
        let Some(frame) = parse_frame(raw) else {
            return Vec::new();
        };
        let mut state = self.state.lock();

        let event = match frame.get("type").and_then(Value::as_str).unwrap_or_default() {
            "session.created" => Some(ModelEvent::SessionCreated {
                session_id: frame
                    .get("session")
                    .and_then(|s| s.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),

            "response.created" => {
                state.response_id = frame
                    .get("response")
                    .and_then(|r| r.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(ModelEvent::ResponseCreated { response_id: state.response_id.clone() })
            }

            "response.done" => {
                let response = frame.get("response").cloned().unwrap_or_default();
                let response_id = response
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| state.response_id.clone());
                let usage = response.get("usage").cloned().unwrap_or_default();
                state.response_id.clear();
                Some(ModelEvent::ResponseDone {
                    response_id,
                    input_tokens: usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
                    output_tokens: usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
                    metadata: HashMap::new(),
                })
            }

            "response.output_audio.delta" => {
                let delta = str_field(&frame, "delta");
                if delta.is_empty() {
                    None
                } else {
                    Some(ModelEvent::ResponseAudioDelta {
                        response_id: state.response_id.clone(),
                        item_id: str_field(&frame, "item_id"),
                        delta,
                        format: AudioFormat::pcm(self.output_sample_rate()),
                    })
                }
            }

            "response.output_audio.done" => Some(ModelEvent::ResponseAudioDone {
                response_id: state.response_id.clone(),
                item_id: str_field(&frame, "item_id"),
            }),

            "response.output_audio_transcript.delta" => {
                let delta = str_field(&frame, "delta");
                if delta.is_empty() {
                    None
                } else {
                    Some(ModelEvent::ResponseAudioTranscriptDelta {
                        response_id: state.response_id.clone(),
                        item_id: str_field(&frame, "item_id"),
                        delta,
                    })
                }
            }

            "response.output_audio_transcript.done" => Some(ModelEvent::ResponseAudioTranscriptDone {
                response_id: state.response_id.clone(),
                item_id: str_field(&frame, "item_id"),
            }),

            "response.function_call_arguments.delta" => {
                let delta = str_field(&frame, "delta");
                let call_id = str_field(&frame, "call_id");
                if delta.is_empty() {
                    None
                } else {
                    let accumulated = state.tool_args.entry(call_id.clone()).or_default();
                    accumulated.push_str(&delta);
                    let raw_input = accumulated.clone();
                    Some(ModelEvent::ResponseToolUseDelta {
                        response_id: state.response_id.clone(),
                        item_id: str_field(&frame, "item_id"),
                        tool_use: ToolUseBlock {
                            id: call_id,
                            name: str_field(&frame, "name"),
                            input: json!({}),
                            raw_input,
                        },
                    })
                }
            }

            "response.function_call_arguments.done" => {
                let call_id = str_field(&frame, "call_id");
                let raw_input = state.tool_args.remove(&call_id).unwrap_or_default();
                Some(ModelEvent::ResponseToolUseDone {
                    response_id: state.response_id.clone(),
                    item_id: str_field(&frame, "item_id"),
                    tool_use: ToolUseBlock {
                        id: call_id,
                        name: str_field(&frame, "name"),
                        input: loads_with_repair(&raw_input),
                        raw_input,
                    },
                })
            }

            "conversation.item.input_audio_transcription.delta" => {
                let delta = str_field(&frame, "delta");
                if delta.is_empty() {
                    None
                } else {
                    Some(ModelEvent::InputTranscriptionDelta {
                        item_id: str_field(&frame, "item_id"),
                        delta,
                    })
                }
            }

            "conversation.item.input_audio_transcription.completed" => {
                let transcript = str_field(&frame, "transcript");
                if transcript.is_empty() {
                    None
                } else {
                    Some(ModelEvent::InputTranscriptionDone {
                        transcript,
                        item_id: str_field(&frame, "item_id"),
                        input_tokens: None,
                        output_tokens: None,
                    })
                }
            }

            "input_audio_buffer.speech_started" => Some(ModelEvent::InputStarted {
                item_id: str_field(&frame, "item_id"),
                audio_start_ms: u64_field(&frame, "audio_start_ms"),
            }),

            "input_audio_buffer.speech_stopped" => Some(ModelEvent::InputDone {
                item_id: str_field(&frame, "item_id"),
                audio_end_ms: u64_field(&frame, "audio_end_ms"),
            }),

            "error" => {
                let error = frame.get("error").cloned().unwrap_or_default();
                Some(ModelEvent::Error {
                    error_type: error
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    code: error
                        .get("code")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("An unknown error occurred.")
                        .to_string(),
                })
            }

            other => {
                debug!(event_type = other, "unknown OpenAI realtime event type");
                None
            }
        };

        event.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tool_schemas_flattens_function() {
        let schemas = vec![json!({
            "type": "function",
            "function": {
                "name": "get_weather",
                "description": "Get the weather",
                "parameters": {"type": "object", "properties": {}},
            },
        })];

        let formatted = OpenAIRealtimeAdapter::format_tool_schemas(&schemas);
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0]["type"], "function");
        assert_eq!(formatted[0]["name"], "get_weather");
        assert_eq!(formatted[0]["description"], "Get the weather");
        assert!(formatted[0].get("function").is_none());
    }

    #[test]
    fn test_session_config_includes_transcription_and_voice() {
        let adapter = OpenAIRealtimeAdapter::new(DEFAULT_MODEL, "sk-test").with_voice("echo");
        let config = adapter.build_session_config("Be helpful.", None);

        assert_eq!(config["type"], "session.update");
        let session = &config["session"];
        assert_eq!(session["instructions"], "Be helpful.");
        assert_eq!(session["audio"]["output"]["voice"], "echo");
        assert_eq!(session["audio"]["input"]["transcription"]["model"], "whisper-1");
        assert!(session.get("tools").is_none());
    }

    #[test]
    fn test_session_config_without_transcription() {
        let adapter =
            OpenAIRealtimeAdapter::new(DEFAULT_MODEL, "sk-test").with_input_transcription(false);
        let config = adapter.build_session_config("x", None);
        assert!(config["session"]["audio"]["input"].get("transcription").is_none());
    }
}
