mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use voxroom::message::ContentBlock;
use voxroom::transport::RealtimeTransport;
use voxroom::{
    AudioFormat, ChatRoom, ClientEvent, ConversationEvent, ModelEvent, RealtimeAgent, ServerEvent,
};

use common::StubTransport;

fn agent_with_transport(name: &str, transport: &Arc<StubTransport>) -> RealtimeAgent {
    RealtimeAgent::new(name, "", Arc::clone(transport) as Arc<dyn RealtimeTransport>)
}

async fn drain_until<F>(rx: &mut mpsc::UnboundedReceiver<ConversationEvent>, mut pred: F)
where
    F: FnMut(&ConversationEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if pred(&event) {
            return;
        }
    }
}

#[tokio::test]
async fn client_events_reach_every_agent() {
    let transport_a = StubTransport::new(24_000, Vec::new());
    let transport_b = StubTransport::new(24_000, Vec::new());
    let mut room = ChatRoom::new(vec![
        agent_with_transport("Ava", &transport_a),
        agent_with_transport("Ben", &transport_b),
    ]);

    let (tx, _rx) = mpsc::unbounded_channel();
    room.start(tx).await.unwrap();

    room.handle_input(ClientEvent::TextAppend {
        session_id: "s1".to_string(),
        text: "hello everyone".to_string(),
    })
    .unwrap();

    let expected = ContentBlock::Text { text: "hello everyone".to_string() };
    assert_eq!(transport_a.wait_for_sent(1).await[0], expected);
    assert_eq!(transport_b.wait_for_sent(1).await[0], expected);

    room.stop().await.unwrap();
}

#[tokio::test]
async fn agent_output_reaches_peers_but_not_itself() {
    let transport_a = StubTransport::new(24_000, Vec::new());
    let transport_b = StubTransport::new(24_000, Vec::new());
    let mut room = ChatRoom::new(vec![
        agent_with_transport("Ava", &transport_a),
        agent_with_transport("Ben", &transport_b),
    ]);
    let ava_id = room.agents()[0].id().to_string();

    let (tx, mut rx) = mpsc::unbounded_channel();
    room.start(tx).await.unwrap();

    // Ava speaks. Valid base64 of four PCM16 samples.
    transport_a.emit(ModelEvent::ResponseAudioDelta {
        response_id: "r1".to_string(),
        item_id: "i1".to_string(),
        delta: "ZADIACwBkAE=".to_string(),
        format: AudioFormat::pcm16_24khz(),
    });

    // The frontend hears Ava exactly once.
    drain_until(&mut rx, |event| {
        matches!(
            event,
            ConversationEvent::Server(ServerEvent::ResponseAudioDelta { agent_id, .. })
                if *agent_id == ava_id
        )
    })
    .await;

    // Ben's model hears Ava; Ava's own model does not.
    let sent_b = transport_b.wait_for_sent(1).await;
    assert!(matches!(sent_b[0], ContentBlock::Audio { .. }));
    assert!(transport_a.sent().is_empty());

    room.stop().await.unwrap();
}

#[tokio::test]
async fn agent_lifecycle_events_reach_the_frontend() {
    let transport_a = StubTransport::new(
        24_000,
        vec![ModelEvent::SessionCreated { session_id: "sa".to_string() }],
    );
    let transport_b = StubTransport::new(
        24_000,
        vec![ModelEvent::SessionCreated { session_id: "sb".to_string() }],
    );
    let mut room = ChatRoom::new(vec![
        agent_with_transport("Ava", &transport_a),
        agent_with_transport("Ben", &transport_b),
    ]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    room.start(tx).await.unwrap();

    let mut ready = Vec::new();
    while ready.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for agent_ready")
            .expect("event channel closed");
        if let ConversationEvent::Server(ServerEvent::AgentReady { agent_name, .. }) = event {
            ready.push(agent_name);
        }
    }
    ready.sort();
    assert_eq!(ready, vec!["Ava".to_string(), "Ben".to_string()]);

    room.stop().await.unwrap();
}
