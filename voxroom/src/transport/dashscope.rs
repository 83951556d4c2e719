//! DashScope realtime transport adapter (Qwen-Omni models).

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
use crate::message::{BlockKind, ContentBlock, MediaSource};
use crate::transport::json::{parse_frame, str_field, u64_field};
use crate::transport::{TransportAdapter, source_data};

/// DashScope realtime WebSocket URL (model appended as query parameter).
pub const DASHSCOPE_REALTIME_URL: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/realtime";

/// Default model for DashScope realtime.
pub const DEFAULT_MODEL: &str = "qwen3-omni-flash-realtime";

/// Default voice for DashScope realtime.
pub const DEFAULT_VOICE: &str = "Cherry";

/// Voices offered by the Qwen-Omni realtime models.
pub const AVAILABLE_VOICES: &[&str] = &["Cherry", "Serena", "Ethan", "Chelsie"];

const SUPPORTED_INPUT: &[BlockKind] = &[BlockKind::Audio, BlockKind::Text, BlockKind::Image];

/// Adapter for the DashScope realtime API.
///
/// The wire protocol is an older OpenAI-realtime dialect: `response.audio.*`
/// rather than `response.output_audio.*`, no tool calling, and 16 kHz input
/// audio. Output is 24 kHz only on `qwen3-omni-flash-realtime` models.
///
/// Audio and transcript frames carry no response id of their own; the
/// adapter tracks the id from `response.created` and stamps it into them,
/// clearing it on `response.done`.
pub struct DashScopeRealtimeAdapter {
    model_name: String,
    api_key: String,
    voice: String,
    input_transcription: bool,
    response_id: Mutex<String>,
}

impl DashScopeRealtimeAdapter {
    /// Create an adapter for the given model and API key.
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            api_key: api_key.into(),
            voice: DEFAULT_VOICE.to_string(),
            input_transcription: true,
            response_id: Mutex::new(String::new()),
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

    fn pcm_format_name(rate: u32) -> String {
        format!("pcm{}", rate / 1_000)
    }
}

#[async_trait]
impl TransportAdapter for DashScopeRealtimeAdapter {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn input_sample_rate(&self) -> u32 {
        16_000
    }

    fn output_sample_rate(&self) -> u32 {
        // Only the flash-realtime family emits 24 kHz audio.
        if self.model_name.starts_with("qwen3-omni-flash-realtime") { 24_000 } else { 16_000 }
    }

    fn supports_tools(&self) -> bool {
        false
    }

    fn supported_input(&self) -> &[BlockKind] {
        SUPPORTED_INPUT
    }

    fn connect_request(&self) -> Result<Request> {
        let url = format!("{}?model={}", DASHSCOPE_REALTIME_URL, self.model_name);
        let mut request = url
            .into_client_request()
            .map_err(|e| RealtimeError::connection(format!("invalid request: {}", e)))?;

        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| RealtimeError::config(format!("invalid API key header: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, auth);
        request
            .headers_mut()
            .insert("X-DashScope-DataInspection", HeaderValue::from_static("disable"));
        Ok(request)
    }

    fn build_session_config(&self, instructions: &str, _tools: Option<&[Value]>) -> Value {
        let mut session = json!({
            "instructions": instructions,
            "modalities": ["audio", "text"],
            "voice": self.voice,
            "input_audio_format": Self::pcm_format_name(self.input_sample_rate()),
            "output_audio_format": Self::pcm_format_name(self.output_sample_rate()),
            "turn_detection": {
                "type": "server_vad",
                "threshold": 0.5,
                "silence_duration_ms": 800,
            },
        });

        if self.input_transcription {
            session["input_audio_transcription"] = json!({"model": "gummy-realtime-v1"});
        }

        json!({"type": "session.update", "session": session})
    }

    async fn encode_outbound(&self, block: &ContentBlock) -> Result<Option<String>> {
        if !SUPPORTED_INPUT.contains(&block.kind()) {
            warn!(
                kind = %block.kind(),
                "DashScope realtime does not accept this input modality, dropping"
            );
            return Ok(None);
        }

        let message = match block {
            ContentBlock::Audio { source } => json!({
                "type": "input_audio_buffer.append",
                "audio": source_data(source).await?,
            }),
            ContentBlock::Image { source } => match source {
                MediaSource::Base64 { data, .. } => json!({
                    "type": "input_image_buffer.append",
                    "image": data,
                }),
                MediaSource::Url { .. } => json!({
                    "type": "input_image_url.append",
                    "image_url": source_data(source).await?,
                }),
            },
            // No conversation-item API; text goes in as response instructions.
            ContentBlock::Text { text } => json!({
                "event_id": uuid::Uuid::new_v4().to_string(),
                "type": "response.create",
                "response": {"instructions": text},
            }),
            ContentBlock::ToolResult { .. } => return Ok(None),
        };

        Ok(Some(message.to_string()))
    }

    fn parse_inbound(&self, raw: &str) -> Vec<ModelEvent> {
        let Some(frame) = parse_frame(raw) else {
            return Vec::new();
        };
        let Some(event_type) = frame.get("type").and_then(Value::as_str) else {
            return Vec::new();
        };

        let event = match event_type {
            "session.created" => {
                let session_id = frame
                    .get("session")
                    .and_then(|s| s.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(ModelEvent::SessionCreated { session_id })
            }
            "response.created" => {
                let response_id = frame
                    .get("response")
                    .and_then(|r| r.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                *self.response_id.lock() = response_id.clone();
                Some(ModelEvent::ResponseCreated { response_id })
            }
            "response.done" => {
                let response = frame.get("response").cloned().unwrap_or_default();
                let usage = response.get("usage").cloned().unwrap_or_default();
                let response_id = response
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| self.response_id.lock().clone());
                self.response_id.lock().clear();
                Some(ModelEvent::ResponseDone {
                    response_id,
                    input_tokens: usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
                    output_tokens: usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
                    metadata: Default::default(),
                })
            }
            // Delta/done frames carry no response id; stamp the tracked one.
            "response.audio.delta" => Some(ModelEvent::ResponseAudioDelta {
                response_id: self.response_id.lock().clone(),
                item_id: str_field(&frame, "item_id"),
                delta: str_field(&frame, "delta"),
                format: AudioFormat::pcm(self.output_sample_rate()),
            }),
            "response.audio.done" => Some(ModelEvent::ResponseAudioDone {
                response_id: self.response_id.lock().clone(),
                item_id: str_field(&frame, "item_id"),
            }),
            "response.audio_transcript.delta" => Some(ModelEvent::ResponseAudioTranscriptDelta {
                response_id: self.response_id.lock().clone(),
                item_id: str_field(&frame, "item_id"),
                delta: str_field(&frame, "delta"),
            }),
            "response.audio_transcript.done" => Some(ModelEvent::ResponseAudioTranscriptDone {
                response_id: self.response_id.lock().clone(),
                item_id: str_field(&frame, "item_id"),
            }),
            "conversation.item.input_audio_transcription.completed" => {
                Some(ModelEvent::InputTranscriptionDone {
                    transcript: str_field(&frame, "transcript"),
                    item_id: str_field(&frame, "item_id"),
                    input_tokens: None,
                    output_tokens: None,
                })
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
                debug!(event_type = other, "ignoring DashScope realtime event");
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
    fn test_output_rate_depends_on_model() {
        let flash = DashScopeRealtimeAdapter::new("qwen3-omni-flash-realtime-2025-08-15", "k");
        assert_eq!(flash.output_sample_rate(), 24_000);

        let other = DashScopeRealtimeAdapter::new("qwen-omni-turbo-realtime", "k");
        assert_eq!(other.output_sample_rate(), 16_000);
        assert_eq!(other.input_sample_rate(), 16_000);
    }

    #[test]
    fn test_session_config_has_no_tools() {
        let adapter = DashScopeRealtimeAdapter::new(DEFAULT_MODEL, "k");
        let config = adapter.build_session_config("hi", Some(&[json!({"type": "function"})]));

        assert_eq!(config["type"], "session.update");
        let session = &config["session"];
        assert!(session.get("tools").is_none());
        assert_eq!(session["input_audio_format"], "pcm16");
        assert_eq!(session["output_audio_format"], "pcm24");
        assert_eq!(session["turn_detection"]["type"], "server_vad");
        assert_eq!(session["input_audio_transcription"]["model"], "gummy-realtime-v1");
    }

    #[test]
    fn test_parse_audio_delta_uses_output_rate() {
        let adapter = DashScopeRealtimeAdapter::new("qwen-omni-turbo-realtime", "k");
        adapter.parse_inbound(r#"{"type": "response.created", "response": {"id": "r1"}}"#);
        // Delta frames carry no response_id field of their own.
        let events = adapter.parse_inbound(
            r#"{"type": "response.audio.delta", "item_id": "i1", "delta": "AAAA"}"#,
        );

        assert_eq!(events.len(), 1);
        match &events[0] {
            ModelEvent::ResponseAudioDelta { response_id, delta, format, .. } => {
                assert_eq!(response_id, "r1");
                assert_eq!(delta, "AAAA");
                assert_eq!(format.sample_rate, 16_000);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed_frame_yields_nothing() {
        let adapter = DashScopeRealtimeAdapter::new(DEFAULT_MODEL, "k");
        assert!(adapter.parse_inbound("not json").is_empty());
        assert!(adapter.parse_inbound(r#"{"no_type": true}"#).is_empty());
        assert!(adapter.parse_inbound(r#"{"type": "something.else"}"#).is_empty());
    }
}
