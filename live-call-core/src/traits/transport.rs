use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::error::SessionError;
use crate::models::media::MediaChunk;
use crate::models::message::{InboundMessage, ToolResult};
use crate::models::setup::SessionSetup;

/// Something the transport pushes to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(InboundMessage),
    Closed,
    Error(String),
}

/// An open connection: the send half plus the stream of pushed events.
pub struct TransportConnection {
    pub sink: Box<dyn TransportSink>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Bidirectional channel to the remote agent.
///
/// Implemented by `GeminiLiveTransport` in `live-call-gemini`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session. Resolves once the remote side accepted the setup.
    async fn open(&self, setup: &SessionSetup) -> Result<TransportConnection, SessionError>;
}

/// Send half of an open connection.
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn send_realtime_input(&self, chunk: MediaChunk) -> Result<(), SessionError>;

    async fn send_tool_result(&self, result: ToolResult) -> Result<(), SessionError>;

    /// Mark the connection closed and start shutting it down.
    ///
    /// Must not block; later sends fail with `SessionError::Disconnected`.
    fn close(&self);
}
