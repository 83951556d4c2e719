use serde_json::json;
use voxroom::DashScopeRealtimeAdapter;
use voxroom::message::{ContentBlock, MediaSource, ToolOutput};
use voxroom::transport::TransportAdapter;
use voxroom::{ModelEvent, RealtimeError};

fn adapter() -> DashScopeRealtimeAdapter {
    DashScopeRealtimeAdapter::new("qwen3-omni-flash-realtime", "key")
}

#[test]
fn session_and_response_lifecycle() {
    let adapter = adapter();

    let created = adapter
        .parse_inbound(r#"{"type": "session.created", "session": {"id": "sess_1"}}"#);
    assert_eq!(created, vec![ModelEvent::SessionCreated { session_id: "sess_1".to_string() }]);

    let started = adapter
        .parse_inbound(r#"{"type": "response.created", "response": {"id": "resp_1"}}"#);
    assert_eq!(started, vec![ModelEvent::ResponseCreated { response_id: "resp_1".to_string() }]);

    let done = adapter.parse_inbound(
        r#"{"type": "response.done", "response": {"id": "resp_1", "usage": {"input_tokens": 2, "output_tokens": 4}}}"#,
    );
    assert_eq!(
        done,
        vec![ModelEvent::ResponseDone {
            response_id: "resp_1".to_string(),
            input_tokens: 2,
            output_tokens: 4,
            metadata: Default::default(),
        }]
    );
}

#[test]
fn deltas_carry_the_tracked_response_id() {
    let adapter = adapter();
    adapter.parse_inbound(r#"{"type": "response.created", "response": {"id": "r1"}}"#);

    // Audio and transcript frames have no response_id field on the wire;
    // the adapter stamps the tracked one in.
    let audio = adapter
        .parse_inbound(r#"{"type": "response.audio.delta", "item_id": "i1", "delta": "AAAA"}"#);
    assert!(matches!(&audio[0], ModelEvent::ResponseAudioDelta { response_id, .. } if response_id == "r1"));

    let transcript = adapter.parse_inbound(
        r#"{"type": "response.audio_transcript.delta", "item_id": "i1", "delta": "he"}"#,
    );
    assert!(matches!(
        &transcript[0],
        ModelEvent::ResponseAudioTranscriptDelta { response_id, .. } if response_id == "r1"
    ));

    // A done frame without an id falls back to the tracked one and clears it.
    let done = adapter.parse_inbound(r#"{"type": "response.done", "response": {}}"#);
    assert!(matches!(&done[0], ModelEvent::ResponseDone { response_id, .. } if response_id == "r1"));

    let stale = adapter
        .parse_inbound(r#"{"type": "response.audio.delta", "item_id": "i2", "delta": "AAAA"}"#);
    assert!(matches!(&stale[0], ModelEvent::ResponseAudioDelta { response_id, .. } if response_id.is_empty()));
}

#[test]
fn speech_boundaries_map_to_input_events() {
    let adapter = adapter();

    let started = adapter.parse_inbound(
        r#"{"type": "input_audio_buffer.speech_started", "item_id": "i1", "audio_start_ms": 120}"#,
    );
    assert_eq!(
        started,
        vec![ModelEvent::InputStarted { item_id: "i1".to_string(), audio_start_ms: 120 }]
    );

    let stopped = adapter.parse_inbound(
        r#"{"type": "input_audio_buffer.speech_stopped", "item_id": "i1", "audio_end_ms": 980}"#,
    );
    assert_eq!(stopped, vec![ModelEvent::InputDone { item_id: "i1".to_string(), audio_end_ms: 980 }]);
}

#[tokio::test]
async fn encode_outbound_wire_shapes() {
    let adapter = adapter();

    let audio = adapter
        .encode_outbound(&ContentBlock::Audio {
            source: MediaSource::Base64 {
                media_type: "audio/pcm".to_string(),
                data: "AAAA".to_string(),
            },
        })
        .await
        .unwrap()
        .unwrap();
    let audio: serde_json::Value = serde_json::from_str(&audio).unwrap();
    assert_eq!(audio["type"], "input_audio_buffer.append");
    assert_eq!(audio["audio"], "AAAA");

    let image = adapter
        .encode_outbound(&ContentBlock::Image {
            source: MediaSource::Base64 {
                media_type: "image/jpeg".to_string(),
                data: "BBBB".to_string(),
            },
        })
        .await
        .unwrap()
        .unwrap();
    let image: serde_json::Value = serde_json::from_str(&image).unwrap();
    assert_eq!(image["type"], "input_image_buffer.append");
    assert_eq!(image["image"], "BBBB");

    // Text is injected as response instructions.
    let text = adapter
        .encode_outbound(&ContentBlock::Text { text: "say hi".to_string() })
        .await
        .unwrap()
        .unwrap();
    let text: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(text["type"], "response.create");
    assert_eq!(text["response"]["instructions"], "say hi");
    assert!(text["event_id"].as_str().is_some());

    // A URL image goes through the fetch path; a bad URL fails before any
    // network I/O instead of being passed along verbatim.
    let bad_url = adapter
        .encode_outbound(&ContentBlock::Image {
            source: MediaSource::Url { url: "not a url".to_string() },
        })
        .await;
    assert!(matches!(bad_url, Err(RealtimeError::ConfigError(_))));

    // No tool calling on this vendor.
    let result = adapter
        .encode_outbound(&ContentBlock::ToolResult {
            id: "call_1".to_string(),
            name: "add".to_string(),
            output: ToolOutput::from("3"),
        })
        .await
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn transcript_events_use_older_wire_names() {
    let adapter = adapter();

    let audio = adapter.parse_inbound(
        r#"{"type": "response.audio.delta", "item_id": "i1", "delta": "AAAA"}"#,
    );
    assert!(matches!(&audio[0], ModelEvent::ResponseAudioDelta { format, .. } if format.sample_rate == 24_000));

    let transcript = adapter.parse_inbound(
        r#"{"type": "response.audio_transcript.delta", "item_id": "i1", "delta": "hel"}"#,
    );
    assert!(matches!(&transcript[0], ModelEvent::ResponseAudioTranscriptDelta { delta, .. } if delta == "hel"));

    let completed = adapter.parse_inbound(
        r#"{"type": "conversation.item.input_audio_transcription.completed", "item_id": "i1", "transcript": "hi"}"#,
    );
    assert!(matches!(&completed[0], ModelEvent::InputTranscriptionDone { transcript, .. } if transcript == "hi"));

    assert_eq!(
        adapter.parse_inbound(json!({"type": "response.text.delta", "delta": "x"}).to_string().as_str()),
        Vec::<ModelEvent>::new()
    );
}
