//! Multi-agent chat rooms.
//!
//! A room wires N agents onto one shared event channel and fans every event
//! out: client events reach every agent, and each agent's server events
//! reach the frontend once plus every *other* agent. Self-exclusion keys on
//! [`ServerEvent::agent_id`], so an agent never hears its own audio back.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::agent::RealtimeAgent;
use crate::error::{RealtimeError, Result};
use crate::events::{ClientEvent, ConversationEvent};

/// A conversation among multiple realtime agents.
pub struct ChatRoom {
    agents: Vec<RealtimeAgent>,
    shared_tx: mpsc::UnboundedSender<ConversationEvent>,
    shared_rx: Option<mpsc::UnboundedReceiver<ConversationEvent>>,
    fanout_task: Option<JoinHandle<()>>,
}

impl ChatRoom {
    /// Create a room over the given agents.
    pub fn new(agents: Vec<RealtimeAgent>) -> Self {
        let (shared_tx, shared_rx) = mpsc::unbounded_channel();
        Self { agents, shared_tx, shared_rx: Some(shared_rx), fanout_task: None }
    }

    /// The agents in this room.
    pub fn agents(&self) -> &[RealtimeAgent] {
        &self.agents
    }

    /// Start every agent and the fan-out loop. Events for the frontend are
    /// emitted on `outgoing`.
    pub async fn start(
        &mut self,
        outgoing: mpsc::UnboundedSender<ConversationEvent>,
    ) -> Result<()> {
        let mut shared_rx = self
            .shared_rx
            .take()
            .ok_or_else(|| RealtimeError::config("chat room already started"))?;

        for agent in &mut self.agents {
            agent.start(self.shared_tx.clone()).await?;
        }
        info!(agents = self.agents.len(), "chat room started");

        let routes: Vec<(String, mpsc::UnboundedSender<ConversationEvent>)> =
            self.agents.iter().map(|a| (a.id().to_string(), a.input_sender())).collect();

        self.fanout_task = Some(tokio::spawn(async move {
            while let Some(event) = shared_rx.recv().await {
                match &event {
                    ConversationEvent::Client(_) => {
                        for (_, route) in &routes {
                            let _ = route.send(event.clone());
                        }
                    }
                    ConversationEvent::Server(server) => {
                        if outgoing.send(event.clone()).is_err() {
                            break;
                        }
                        // Session-level events carry no agent id and go
                        // only outward.
                        if let Some(sender) = server.agent_id() {
                            for (id, route) in &routes {
                                if sender != id.as_str() {
                                    let _ = route.send(event.clone());
                                }
                            }
                        }
                    }
                }
            }
        }));

        Ok(())
    }

    /// Stop every agent and the fan-out loop.
    pub async fn stop(&mut self) -> Result<()> {
        for agent in &mut self.agents {
            agent.stop().await?;
        }
        if let Some(task) = self.fanout_task.take() {
            task.abort();
        }
        info!("chat room stopped");
        Ok(())
    }

    /// Inject a client event into the room; it reaches every agent.
    pub fn handle_input(&self, event: ClientEvent) -> Result<()> {
        self.shared_tx.send(event.into()).map_err(|_| RealtimeError::SessionClosed)
    }
}
