//! Realtime transports.
//!
//! A [`TransportAdapter`] owns the vendor-specific protocol knowledge: the
//! handshake request, the session-configuration payload, outbound block
//! encoding, and inbound frame parsing. [`WebSocketTransport`] supplies the
//! vendor-independent connection lifecycle around an adapter: it opens the
//! socket, sends the session config, pumps inbound frames through
//! `parse_inbound`, and forwards the resulting [`ModelEvent`]s onto the
//! caller's channel in arrival order.
//!
//! Agents consume transports through the [`RealtimeTransport`] trait so
//! tests can substitute scripted stubs.

pub mod dashscope;
pub mod gemini;
pub mod openai;

pub(crate) mod json;

use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{MaybeTlsStream, connect_async};
use tracing::{debug, info};

use crate::error::{RealtimeError, Result};
use crate::events::ModelEvent;
use crate::message::{BlockKind, ContentBlock, MediaSource};

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, Message>;

/// Vendor-specific protocol logic for one realtime model API.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// The vendor model name.
    fn model_name(&self) -> &str;

    /// Sample rate (Hz) the vendor expects for input audio.
    fn input_sample_rate(&self) -> u32;

    /// Sample rate (Hz) of the vendor's output audio.
    fn output_sample_rate(&self) -> u32;

    /// Whether the vendor supports tool calling.
    fn supports_tools(&self) -> bool {
        false
    }

    /// The input modalities this vendor accepts.
    fn supported_input(&self) -> &[BlockKind];

    /// Build the WebSocket handshake request (URL plus auth headers).
    fn connect_request(&self) -> Result<Request>;

    /// Build the vendor session-configuration message sent right after the
    /// socket opens.
    fn build_session_config(&self, instructions: &str, tools: Option<&[Value]>) -> Value;

    /// Encode one media block into a vendor wire message. Returns
    /// `Ok(None)` when the block's modality is not accepted by this vendor
    /// (logged, never fatal).
    async fn encode_outbound(&self, block: &ContentBlock) -> Result<Option<String>>;

    /// Parse one inbound frame into zero or more model events. Malformed
    /// and unknown frames yield an empty vec; this method never fails.
    fn parse_inbound(&self, raw: &str) -> Vec<ModelEvent>;
}

/// What an agent needs from a transport: connection lifecycle plus a way to
/// send media blocks.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Open the connection, send the session config, and start forwarding
    /// parsed model events onto `events` in arrival order.
    async fn connect(
        &self,
        events: mpsc::UnboundedSender<ModelEvent>,
        instructions: &str,
        tools: Option<Vec<Value>>,
    ) -> Result<()>;

    /// Send one media block. Fails with [`RealtimeError::NotConnected`]
    /// before `connect` or after `disconnect`.
    async fn send(&self, block: ContentBlock) -> Result<()>;

    /// Stop the receive pump and close the connection.
    async fn disconnect(&self) -> Result<()>;

    /// Sample rate (Hz) this transport expects for input audio.
    fn input_sample_rate(&self) -> u32;

    /// Whether this transport supports tool calling.
    fn supports_tools(&self) -> bool;
}

struct Connection {
    sink: Arc<Mutex<WsSink>>,
    pump: JoinHandle<()>,
}

/// The vendor-independent WebSocket base loop around a [`TransportAdapter`].
pub struct WebSocketTransport {
    adapter: Arc<dyn TransportAdapter>,
    conn: RwLock<Option<Connection>>,
}

impl WebSocketTransport {
    /// Wrap an adapter in the WebSocket connection lifecycle.
    pub fn new(adapter: impl TransportAdapter + 'static) -> Self {
        Self { adapter: Arc::new(adapter), conn: RwLock::new(None) }
    }
}

#[async_trait]
impl RealtimeTransport for WebSocketTransport {
    async fn connect(
        &self,
        events: mpsc::UnboundedSender<ModelEvent>,
        instructions: &str,
        tools: Option<Vec<Value>>,
    ) -> Result<()> {
        let request = self.adapter.connect_request()?;
        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| RealtimeError::connection(format!("WebSocket connect error: {}", e)))?;
        let (sink, mut source) = stream.split();
        let sink = Arc::new(Mutex::new(sink));

        info!(model = %self.adapter.model_name(), "realtime transport connected");

        // Receive pump: every frame goes through the adapter; events are
        // forwarded in arrival order.
        let adapter = Arc::clone(&self.adapter);
        let pump = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => continue,
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!(model = %adapter.model_name(), error = %e, "websocket read failed, stopping receive pump");
                        break;
                    }
                };
                for event in adapter.parse_inbound(&text) {
                    if events.send(event).is_err() {
                        return;
                    }
                }
            }
        });

        let config = self.adapter.build_session_config(instructions, tools.as_deref());
        sink.lock()
            .await
            .send(Message::Text(config.to_string()))
            .await
            .map_err(|e| RealtimeError::connection(format!("failed to send session config: {}", e)))?;

        *self.conn.write().await = Some(Connection { sink, pump });
        Ok(())
    }

    async fn send(&self, block: ContentBlock) -> Result<()> {
        let guard = self.conn.read().await;
        let Some(conn) = guard.as_ref() else {
            return Err(RealtimeError::NotConnected);
        };

        let Some(message) = self.adapter.encode_outbound(&block).await? else {
            return Ok(());
        };

        conn.sink
            .lock()
            .await
            .send(Message::Text(message))
            .await
            .map_err(|e| RealtimeError::protocol(format!("WebSocket send error: {}", e)))
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(conn) = self.conn.write().await.take() {
            conn.pump.abort();
            let _ = conn.sink.lock().await.close().await;
            info!(model = %self.adapter.model_name(), "realtime transport disconnected");
        }
        Ok(())
    }

    fn input_sample_rate(&self) -> u32 {
        self.adapter.input_sample_rate()
    }

    fn supports_tools(&self) -> bool {
        self.adapter.supports_tools()
    }
}

/// Resolve a media source to base64 data, fetching URL sources over HTTP.
pub(crate) async fn source_data(source: &MediaSource) -> Result<String> {
    match source {
        MediaSource::Base64 { data, .. } => Ok(data.clone()),
        MediaSource::Url { url } => {
            let url = url::Url::parse(url)
                .map_err(|e| RealtimeError::config(format!("invalid media URL {}: {}", url, e)))?;
            let response = reqwest::get(url.clone())
                .await
                .map_err(|e| RealtimeError::connection(format!("failed to fetch {}: {}", url, e)))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| RealtimeError::connection(format!("failed to read {}: {}", url, e)))?;
            Ok(BASE64_STANDARD.encode(&bytes))
        }
    }
}
