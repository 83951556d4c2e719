//! The realtime conversational agent.
//!
//! An agent wraps one realtime transport and runs two loops:
//!
//! - The **inbound loop** drains the agent's input channel and forwards the
//!   media it cares about to the model: user audio, text, and images, plus
//!   audio spoken by *other* agents (resampled to this transport's input
//!   rate when the rates differ). Everything else on the channel is
//!   ignored, so an agent can sit on a busy shared channel unharmed.
//! - The **outbound loop** drains the transport's model events, projects
//!   them into [`ServerEvent`]s, and dispatches completed tool calls to the
//!   toolkit without blocking: the tool runs in its own task while model
//!   events keep flowing.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::resample_base64_pcm16;
use crate::error::{RealtimeError, Result};
use crate::events::{ClientEvent, ConversationEvent, ModelEvent, ServerEvent};
use crate::message::{ContentBlock, MediaSource, ToolOutput, ToolResultBlock, ToolUseBlock};
use crate::tools::Toolkit;
use crate::transport::RealtimeTransport;

/// A conversational agent backed by a realtime model transport.
pub struct RealtimeAgent {
    id: String,
    name: String,
    instructions: String,
    transport: Arc<dyn RealtimeTransport>,
    toolkit: Option<Arc<dyn Toolkit>>,
    incoming_tx: mpsc::UnboundedSender<ConversationEvent>,
    incoming_rx: Option<mpsc::UnboundedReceiver<ConversationEvent>>,
    inbound_task: Option<JoinHandle<()>>,
    outbound_task: Option<JoinHandle<()>>,
}

impl RealtimeAgent {
    /// Create an agent with a display name, system instructions, and a
    /// transport. The agent id is generated.
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.into(),
            instructions: instructions.into(),
            transport,
            toolkit: None,
            incoming_tx,
            incoming_rx: Some(incoming_rx),
            inbound_task: None,
            outbound_task: None,
        }
    }

    /// Attach a toolkit. Its schemas are registered with the model if the
    /// transport supports tool calling.
    pub fn with_toolkit(mut self, toolkit: Arc<dyn Toolkit>) -> Self {
        self.toolkit = Some(toolkit);
        self
    }

    /// The agent id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The agent display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A sender for the agent's input channel, for routing layers.
    pub(crate) fn input_sender(&self) -> mpsc::UnboundedSender<ConversationEvent> {
        self.incoming_tx.clone()
    }

    /// Connect the transport and start both processing loops. Server events
    /// are emitted on `outgoing` in the order the model produced them.
    pub async fn start(
        &mut self,
        outgoing: mpsc::UnboundedSender<ConversationEvent>,
    ) -> Result<()> {
        let mut incoming_rx = self
            .incoming_rx
            .take()
            .ok_or_else(|| RealtimeError::config("agent already started"))?;

        let tools = match (&self.toolkit, self.transport.supports_tools()) {
            (Some(toolkit), true) => Some(toolkit.schemas()),
            (Some(_), false) => {
                warn!(agent = %self.name, "transport does not support tools, toolkit schemas not registered");
                None
            }
            (None, _) => None,
        };

        let (model_tx, mut model_rx) = mpsc::unbounded_channel();
        self.transport.connect(model_tx, &self.instructions, tools).await?;
        info!(agent = %self.name, id = %self.id, "agent started");

        let transport = Arc::clone(&self.transport);
        let agent_name = self.name.clone();
        self.inbound_task = Some(tokio::spawn(async move {
            while let Some(event) = incoming_rx.recv().await {
                if let Err(e) = forward_input(&transport, &event).await {
                    warn!(agent = %agent_name, error = %e, "failed to forward input to model");
                }
            }
        }));

        let transport = Arc::clone(&self.transport);
        let toolkit = self.toolkit.clone();
        let agent_id = self.id.clone();
        let agent_name = self.name.clone();
        self.outbound_task = Some(tokio::spawn(async move {
            while let Some(event) = model_rx.recv().await {
                let tool_use = match &event {
                    ModelEvent::ResponseToolUseDone { tool_use, .. } => Some(tool_use.clone()),
                    _ => None,
                };

                let server = ServerEvent::from_model(event, &agent_id, &agent_name);
                if outgoing.send(server.into()).is_err() {
                    break;
                }

                // The completed-call event goes out before the tool runs, and
                // the tool runs off-loop so model events keep flowing.
                if let (Some(tool_use), Some(toolkit)) = (tool_use, toolkit.clone()) {
                    tokio::spawn(run_tool(
                        toolkit,
                        Arc::clone(&transport),
                        outgoing.clone(),
                        tool_use,
                        agent_id.clone(),
                        agent_name.clone(),
                    ));
                }
            }
        }));

        Ok(())
    }

    /// Stop the agent: the inbound loop is cancelled outright, then the
    /// transport disconnect closes the model-event channel and the outbound
    /// loop drains whatever is already queued before exiting.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.inbound_task.take() {
            task.abort();
        }
        self.transport.disconnect().await?;
        self.outbound_task.take();
        info!(agent = %self.name, id = %self.id, "agent stopped");
        Ok(())
    }

    /// Queue an event onto the agent's input channel.
    pub fn handle_input(&self, event: impl Into<ConversationEvent>) -> Result<()> {
        self.incoming_tx.send(event.into()).map_err(|_| RealtimeError::SessionClosed)
    }
}

/// Forward one conversation event to the model, if it carries input the
/// model should hear. All other events are ignored.
async fn forward_input(
    transport: &Arc<dyn RealtimeTransport>,
    event: &ConversationEvent,
) -> Result<()> {
    match event {
        // Another agent speaking: resample to this model's input rate.
        ConversationEvent::Server(ServerEvent::ResponseAudioDelta { delta, format, .. }) => {
            let audio = resample_base64_pcm16(delta, format.sample_rate, transport.input_sample_rate())?;
            transport
                .send(ContentBlock::Audio {
                    source: MediaSource::Base64 { media_type: format.encoding.clone(), data: audio },
                })
                .await
        }
        // Client audio is forwarded untouched; the frontend captures at the
        // rate it negotiated with its transport.
        ConversationEvent::Client(ClientEvent::AudioAppend { audio, format, .. }) => {
            transport
                .send(ContentBlock::Audio {
                    source: MediaSource::Base64 {
                        media_type: format.encoding.clone(),
                        data: audio.clone(),
                    },
                })
                .await
        }
        ConversationEvent::Client(ClientEvent::TextAppend { text, .. }) => {
            transport.send(ContentBlock::Text { text: text.clone() }).await
        }
        ConversationEvent::Client(ClientEvent::ImageAppend { image, format, .. }) => {
            let media_type = format
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("image/jpeg")
                .to_string();
            transport
                .send(ContentBlock::Image {
                    source: MediaSource::Base64 { media_type, data: image.clone() },
                })
                .await
        }
        other => {
            debug!(?other, "ignoring non-input conversation event");
            Ok(())
        }
    }
}

/// Run one tool call to completion, feed the result back to the model, and
/// report it outward. Failures become an error event rather than a crash.
async fn run_tool(
    toolkit: Arc<dyn Toolkit>,
    transport: Arc<dyn RealtimeTransport>,
    outgoing: mpsc::UnboundedSender<ConversationEvent>,
    tool_use: ToolUseBlock,
    agent_id: String,
    agent_name: String,
) {
    match invoke_tool(&*toolkit, &*transport, &tool_use).await {
        Ok(tool_result) => {
            let _ = outgoing.send(
                ServerEvent::ResponseToolResult { tool_result, agent_id, agent_name }.into(),
            );
        }
        Err(e) => {
            error!(agent = %agent_name, tool = %tool_use.name, error = %e, "tool invocation failed");
            let _ = outgoing.send(
                ServerEvent::Error {
                    error_type: "tool_error".to_string(),
                    code: "tool_invocation_failed".to_string(),
                    message: e.to_string(),
                    agent_id,
                    agent_name,
                }
                .into(),
            );
        }
    }
}

async fn invoke_tool(
    toolkit: &dyn Toolkit,
    transport: &dyn RealtimeTransport,
    tool_use: &ToolUseBlock,
) -> Result<ToolResultBlock> {
    let mut stream = toolkit.call_tool(tool_use).await?;
    // Intermediate chunks are progress updates; the last one is the result.
    let mut output = ToolOutput::Text(String::new());
    while let Some(chunk) = stream.next().await {
        output = chunk;
    }

    transport
        .send(ContentBlock::ToolResult {
            id: tool_use.id.clone(),
            name: tool_use.name.clone(),
            output: output.clone(),
        })
        .await?;

    Ok(ToolResultBlock { id: tool_use.id.clone(), name: tool_use.name.clone(), output })
}
