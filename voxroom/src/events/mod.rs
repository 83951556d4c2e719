//! The three-tier event taxonomy.
//!
//! - [`ModelEvent`]: vendor-neutral representation of what a realtime model
//!   emitted, produced by transport adapters.
//! - [`ClientEvent`]: frontend-to-backend vocabulary.
//! - [`ServerEvent`]: backend-to-frontend vocabulary, a mechanical
//!   projection of model events plus agent identity.
//!
//! [`ConversationEvent`] unites the client and server vocabularies as the
//! payload of every inter-agent channel.

pub mod client;
pub mod model;
pub mod server;

pub use client::ClientEvent;
pub use model::ModelEvent;
pub use server::ServerEvent;

use serde::{Deserialize, Serialize};

/// An event flowing between the frontend, agents, and the chat room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationEvent {
    /// An event originating from a frontend.
    Client(ClientEvent),
    /// An event originating from an agent or the backend.
    Server(ServerEvent),
}

impl From<ClientEvent> for ConversationEvent {
    fn from(event: ClientEvent) -> Self {
        Self::Client(event)
    }
}

impl From<ServerEvent> for ConversationEvent {
    fn from(event: ServerEvent) -> Self {
        Self::Server(event)
    }
}
