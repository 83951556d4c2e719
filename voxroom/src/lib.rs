//! Realtime voice agents over vendor WebSocket APIs.
//!
//! voxroom connects conversational agents to realtime speech models
//! (OpenAI Realtime, Gemini Live, DashScope/Qwen-Omni) through one
//! vendor-neutral event vocabulary, and lets multiple agents talk to each
//! other in a [`ChatRoom`].
//!
//! # Architecture
//!
//! Vendor protocols are isolated in [`transport`] adapters that translate
//! wire frames to and from [`ModelEvent`]s. A [`RealtimeAgent`] runs two
//! loops over one transport: an inbound loop feeding user and peer media to
//! the model, and an outbound loop projecting model events into
//! [`ServerEvent`]s and dispatching tool calls. A [`ChatRoom`] broadcasts
//! events among agents, excluding each agent's own output from its input.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio::sync::mpsc;
//! use voxroom::transport::WebSocketTransport;
//! use voxroom::transport::openai::OpenAIRealtimeAdapter;
//! use voxroom::RealtimeAgent;
//!
//! # async fn run() -> voxroom::Result<()> {
//! let adapter = OpenAIRealtimeAdapter::new("gpt-4o-realtime-preview", "sk-...");
//! let transport = Arc::new(WebSocketTransport::new(adapter));
//! let mut agent = RealtimeAgent::new("Ava", "You are a helpful assistant.", transport);
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! agent.start(tx).await?;
//! while let Some(event) = rx.recv().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod audio;
pub mod error;
pub mod events;
pub mod message;
pub mod room;
pub mod tools;
pub mod transport;

pub use agent::RealtimeAgent;
pub use audio::{AudioFormat, resample_base64_pcm16, resample_pcm16};
pub use error::{RealtimeError, Result};
pub use events::{ClientEvent, ConversationEvent, ModelEvent, ServerEvent};
pub use message::{
    BlockKind, ContentBlock, MediaSource, ToolOutput, ToolResultBlock, ToolUseBlock,
};
pub use room::ChatRoom;
pub use tools::Toolkit;
pub use transport::{RealtimeTransport, TransportAdapter, WebSocketTransport};
pub use transport::dashscope::DashScopeRealtimeAdapter;
pub use transport::gemini::GeminiRealtimeAdapter;
pub use transport::openai::OpenAIRealtimeAdapter;
