#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use voxroom::message::ContentBlock;
use voxroom::transport::RealtimeTransport;
use voxroom::{ModelEvent, Result};

/// A scripted transport: replays a fixed list of model events on connect
/// and records every block sent to it.
pub struct StubTransport {
    input_rate: u32,
    tools: bool,
    script: Mutex<Vec<ModelEvent>>,
    sent: Mutex<Vec<ContentBlock>>,
    events: Mutex<Option<mpsc::UnboundedSender<ModelEvent>>>,
}

impl StubTransport {
    pub fn new(input_rate: u32, script: Vec<ModelEvent>) -> Arc<Self> {
        Arc::new(Self {
            input_rate,
            tools: true,
            script: Mutex::new(script),
            sent: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        })
    }

    pub fn sent(&self) -> Vec<ContentBlock> {
        self.sent.lock().unwrap().clone()
    }

    /// Emit a model event after connect, as if the vendor pushed a frame.
    pub fn emit(&self, event: ModelEvent) {
        let guard = self.events.lock().unwrap();
        let sender = guard.as_ref().expect("transport not connected");
        sender.send(event).expect("agent outbound loop gone");
    }

    /// Poll until `count` blocks have been sent, with a 2 s deadline.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<ContentBlock> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {} sent blocks, got {:?}", count, sent);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl RealtimeTransport for StubTransport {
    async fn connect(
        &self,
        events: mpsc::UnboundedSender<ModelEvent>,
        _instructions: &str,
        _tools: Option<Vec<Value>>,
    ) -> Result<()> {
        for event in self.script.lock().unwrap().drain(..) {
            let _ = events.send(event);
        }
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn send(&self, block: ContentBlock) -> Result<()> {
        self.sent.lock().unwrap().push(block);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.events.lock().unwrap().take();
        Ok(())
    }

    fn input_sample_rate(&self) -> u32 {
        self.input_rate
    }

    fn supports_tools(&self) -> bool {
        self.tools
    }
}
