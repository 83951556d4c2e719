//! Gemini Live API transport adapter.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tracing::{debug, info, warn};

use crate::audio::AudioFormat;
use crate::error::{RealtimeError, Result};
use crate::events::ModelEvent;
use crate::message::{BlockKind, ContentBlock, MediaSource, ToolOutput, ToolUseBlock};
use crate::transport::json::parse_frame;
use crate::transport::{TransportAdapter, source_data};

/// Gemini Live API WebSocket URL (API key appended as query parameter).
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Default model for Gemini Live.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio";

/// Default voice for Gemini Live.
pub const DEFAULT_VOICE: &str = "Puck";

/// Prebuilt voices offered by the Live API.
pub const AVAILABLE_VOICES: &[&str] = &["Puck", "Charon", "Kore", "Fenrir", "Aoede"];

/// Session id reported for Gemini connections; the Live API has no session
/// id of its own.
const GEMINI_SESSION_ID: &str = "gemini_session";

const SUPPORTED_INPUT: &[BlockKind] =
    &[BlockKind::Audio, BlockKind::Text, BlockKind::Image, BlockKind::ToolResult];

/// Adapter for the Gemini Live API (16 kHz PCM in, 24 kHz out, tools
/// supported).
///
/// Gemini sends no explicit response-created event, so a synthetic response
/// id is generated on the first content chunk of a turn and cleared on
/// `generationComplete`, on `turnComplete` while a response is in flight,
/// and on tool-call cancellation.
pub struct GeminiRealtimeAdapter {
    model_name: String,
    api_key: String,
    voice: String,
    input_transcription: bool,
    response_id: Mutex<Option<String>>,
}

impl GeminiRealtimeAdapter {
    /// Create an adapter for the given model and API key.
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            api_key: api_key.into(),
            voice: DEFAULT_VOICE.to_string(),
            input_transcription: true,
            response_id: Mutex::new(None),
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

    /// Group chat-style tool schemas into Gemini's `function_declarations`
    /// shape.
    fn format_tool_schemas(schemas: &[Value]) -> Vec<Value> {
        let declarations: Vec<Value> =
            schemas.iter().filter_map(|schema| schema.get("function").cloned()).collect();
        vec![json!({"function_declarations": declarations})]
    }

    /// Return the in-flight response id, generating one on first content.
    fn ensure_response_id(&self) -> String {
        let mut guard = self.response_id.lock();
        guard
            .get_or_insert_with(|| format!("resp_{}", uuid::Uuid::new_v4().simple()))
            .clone()
    }

    fn response_done(response_id: String) -> ModelEvent {
        ModelEvent::ResponseDone {
            response_id,
            input_tokens: 0,
            output_tokens: 0,
            metadata: Default::default(),
        }
    }

    /// Emit a response-done, consuming the in-flight id; the id is empty
    /// for turns that never produced content (transcription-only turns
    /// still terminate).
    fn finish_response(&self) -> ModelEvent {
        Self::response_done(self.response_id.lock().take().unwrap_or_default())
    }

    /// Emit a response-done only when a response is actually in flight.
    fn finish_inflight_response(&self) -> Option<ModelEvent> {
        self.response_id.lock().take().map(Self::response_done)
    }

    fn parse_server_content(&self, content: &Map<String, Value>) -> Option<ModelEvent> {
        if let Some(model_turn) = content.get("modelTurn") {
            return self.parse_model_turn(model_turn);
        }

        if let Some(transcription) = content.get("outputTranscription") {
            let text = transcription.get("text").and_then(Value::as_str).unwrap_or_default();
            if text.is_empty() {
                return None;
            }
            return Some(ModelEvent::ResponseAudioTranscriptDelta {
                response_id: self.response_id.lock().clone().unwrap_or_default(),
                item_id: String::new(),
                delta: text.to_string(),
            });
        }

        if let Some(transcription) = content.get("inputTranscription") {
            let text = transcription.get("text").and_then(Value::as_str).unwrap_or_default();
            if text.is_empty() {
                return None;
            }
            return Some(ModelEvent::InputTranscriptionDone {
                transcript: text.to_string(),
                item_id: String::new(),
                input_tokens: None,
                output_tokens: None,
            });
        }

        if content.contains_key("generationComplete") {
            return Some(self.finish_response());
        }

        if content.contains_key("turnComplete") {
            debug!("Gemini: turnComplete received");
            // turnComplete without a preceding generationComplete marks an
            // interrupted response; it terminates the turn, but only when a
            // response is in flight (otherwise generationComplete already
            // finished it).
            return self.finish_inflight_response();
        }

        if content.contains_key("interrupted") {
            debug!("Gemini: response interrupted");
        }

        None
    }

    fn parse_model_turn(&self, model_turn: &Value) -> Option<ModelEvent> {
        let parts = model_turn.get("parts").and_then(Value::as_array)?;

        for part in parts {
            if let Some(inline) = part.get("inlineData") {
                let mime_type = inline.get("mimeType").and_then(Value::as_str).unwrap_or_default();
                let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
                if mime_type.starts_with("audio/") && !data.is_empty() {
                    return Some(ModelEvent::ResponseAudioDelta {
                        response_id: self.ensure_response_id(),
                        item_id: String::new(),
                        delta: data.to_string(),
                        format: AudioFormat::pcm(self.output_sample_rate()),
                    });
                }
            }

            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    return Some(ModelEvent::ResponseAudioTranscriptDelta {
                        response_id: self.ensure_response_id(),
                        item_id: String::new(),
                        delta: text.to_string(),
                    });
                }
            }
        }

        None
    }

    fn parse_tool_call(&self, tool_call: &Value) -> Vec<ModelEvent> {
        let Some(function_calls) = tool_call.get("functionCalls").and_then(Value::as_array) else {
            return Vec::new();
        };
        let response_id = self.response_id.lock().clone().unwrap_or_default();

        function_calls
            .iter()
            .map(|call| {
                let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                ModelEvent::ResponseToolUseDone {
                    response_id: response_id.clone(),
                    item_id: String::new(),
                    tool_use: ToolUseBlock {
                        id: call.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                        name: call
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        raw_input: args.to_string(),
                        input: args,
                    },
                }
            })
            .collect()
    }

    /// Shape a tool output as Gemini's structured function response: JSON
    /// text passes through parsed, anything else is wrapped as
    /// `{"result": ...}`.
    fn structured_output(output: &ToolOutput) -> Value {
        match output {
            ToolOutput::Text(text) => {
                serde_json::from_str(text).unwrap_or_else(|_| json!({"result": text}))
            }
            ToolOutput::Json(value) if value.is_object() => value.clone(),
            ToolOutput::Json(value) => json!({"result": value}),
        }
    }
}

#[async_trait]
impl TransportAdapter for GeminiRealtimeAdapter {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn input_sample_rate(&self) -> u32 {
        16_000
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
        let url = format!("{}?key={}", GEMINI_LIVE_URL, self.api_key);
        url.into_client_request()
            .map_err(|e| RealtimeError::connection(format!("invalid request: {}", e)))
    }

    fn build_session_config(&self, instructions: &str, tools: Option<&[Value]>) -> Value {
        let mut setup = json!({
            "model": format!("models/{}", self.model_name),
            "systemInstruction": {
                "parts": [{"text": instructions}],
            },
            "outputAudioTranscription": {},
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {"voiceName": self.voice},
                    },
                },
            },
        });

        if self.input_transcription {
            setup["inputAudioTranscription"] = json!({});
        }

        if let Some(tools) = tools {
            if !tools.is_empty() {
                setup["tools"] = Value::Array(Self::format_tool_schemas(tools));
            }
        }

        json!({"setup": setup})
    }

    async fn encode_outbound(&self, block: &ContentBlock) -> Result<Option<String>> {
        if !SUPPORTED_INPUT.contains(&block.kind()) {
            warn!(
                kind = %block.kind(),
                "Gemini Live API does not accept this input modality, dropping"
            );
            return Ok(None);
        }

        let message = match block {
            ContentBlock::Audio { source } => json!({
                "realtimeInput": {
                    "audio": {
                        "mimeType": format!("audio/pcm;rate={}", self.input_sample_rate()),
                        "data": source_data(source).await?,
                    },
                },
            }),
            ContentBlock::Image { source } => {
                let media_type = match source {
                    MediaSource::Base64 { media_type, .. } => media_type.clone(),
                    MediaSource::Url { .. } => "image/jpeg".to_string(),
                };
                json!({
                    "realtimeInput": {
                        "video": {
                            "mimeType": media_type,
                            "data": source_data(source).await?,
                        },
                    },
                })
            }
            ContentBlock::Text { text } => json!({
                "clientContent": {
                    "turns": [{
                        "role": "user",
                        "parts": [{"text": text}],
                    }],
                    "turnComplete": true,
                },
            }),
            ContentBlock::ToolResult { id, name, output } => json!({
                "toolResponse": {
                    "functionResponses": [{
                        "id": id,
                        "name": name,
                        "response": Self::structured_output(output),
                    }],
                },
            }),
        };

        Ok(Some(message.to_string()))
    }

    fn parse_inbound(&self, raw: &str) -> Vec<ModelEvent> {
        let Some(frame) = parse_frame(raw) else {
            return Vec::new();
        };

        if frame.contains_key("setupComplete") {
            return vec![ModelEvent::SessionCreated { session_id: GEMINI_SESSION_ID.to_string() }];
        }

        if let Some(content) = frame.get("serverContent").and_then(Value::as_object) {
            return self.parse_server_content(content).into_iter().collect();
        }

        if let Some(tool_call) = frame.get("toolCall") {
            return self.parse_tool_call(tool_call);
        }

        if let Some(cancellation) = frame.get("toolCallCancellation") {
            // Cancellation terminates the current response.
            info!(cancellation = %cancellation, "Gemini tool call cancelled");
            return vec![self.finish_response()];
        }

        if let Some(error) = frame.get("error") {
            return vec![ModelEvent::Error {
                error_type: error
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                code: error
                    .get("code")
                    .map(|c| match c {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "unknown".to_string()),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("An unknown error occurred.")
                    .to_string(),
            }];
        }

        debug!(keys = ?frame.keys().collect::<Vec<_>>(), "unknown Gemini live message");
        Vec::new()
    }
}
