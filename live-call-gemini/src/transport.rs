use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use live_call_core::{
    MediaChunk, SessionError, SessionSetup, ToolResult, Transport, TransportConnection,
    TransportEvent, TransportSink,
};

use crate::config::GeminiConfig;
use crate::protocol::{ClientMessage, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

const OUTGOING_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 64;

/// `Transport` over the Gemini Live bidirectional WebSocket.
pub struct GeminiLiveTransport {
    config: GeminiConfig,
}

impl GeminiLiveTransport {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for GeminiLiveTransport {
    async fn open(&self, setup: &SessionSetup) -> Result<TransportConnection, SessionError> {
        self.config.validate()?;

        log::info!("Connecting to Gemini Live ({})", self.config.live_model);
        let (ws, _response) = connect_async(self.config.live_url())
            .await
            .map_err(|e| SessionError::TransportError(format!("websocket connect failed: {}", e)))?;
        let (mut write, mut read) = ws.split();

        let frame = ClientMessage::setup(&self.config.live_model, setup)
            .to_json()
            .map_err(|e| SessionError::EncodingFailed(format!("setup frame: {}", e)))?;
        write
            .send(Message::Text(frame))
            .await
            .map_err(|e| SessionError::TransportError(format!("failed to send setup: {}", e)))?;

        match tokio::time::timeout(self.config.setup_timeout(), wait_for_setup(&mut read)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SessionError::TransportError(format!(
                    "no setupComplete within {}s",
                    self.config.setup_timeout_secs
                )))
            }
        }
        log::info!("Gemini Live session set up");

        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        tokio::spawn(write_loop(write, outgoing_rx));
        let reader = tokio::spawn(read_loop(read, event_tx));

        Ok(TransportConnection {
            sink: Box::new(GeminiSink {
                outgoing: outgoing_tx,
                closed: AtomicBool::new(false),
                reader: reader.abort_handle(),
            }),
            events: event_rx,
        })
    }
}

/// Send half of an open Gemini Live connection.
pub struct GeminiSink {
    outgoing: mpsc::Sender<Message>,
    closed: AtomicBool,
    reader: AbortHandle,
}

impl GeminiSink {
    async fn send(&self, message: ClientMessage) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Disconnected);
        }
        let frame = message
            .to_json()
            .map_err(|e| SessionError::EncodingFailed(e.to_string()))?;
        self.outgoing
            .send(Message::Text(frame))
            .await
            .map_err(|_| SessionError::Disconnected)
    }
}

#[async_trait]
impl TransportSink for GeminiSink {
    async fn send_realtime_input(&self, chunk: MediaChunk) -> Result<(), SessionError> {
        self.send(ClientMessage::realtime_input(chunk)).await
    }

    async fn send_tool_result(&self, result: ToolResult) -> Result<(), SessionError> {
        self.send(ClientMessage::tool_response(result)).await
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.reader.abort();
        // Writer also stops once every sender is gone
        if self.outgoing.try_send(Message::Close(None)).is_err() {
            log::debug!("Close frame not queued, writer busy or gone");
        }
        log::info!("Gemini Live connection closing");
    }
}

impl Drop for GeminiSink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Read frames until `setupComplete` arrives.
async fn wait_for_setup(read: &mut WsRead) -> Result<(), SessionError> {
    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Ok(Message::Close(reason)) => {
                return Err(SessionError::TransportError(format!(
                    "closed during setup: {}",
                    close_reason(reason.as_ref())
                )))
            }
            Ok(_) => continue,
            Err(e) => return Err(SessionError::TransportError(e.to_string())),
        };

        match ServerMessage::parse(&text) {
            Ok(message) if message.is_setup_complete() => return Ok(()),
            Ok(_) => log::debug!("Ignoring frame received before setupComplete"),
            Err(e) => log::warn!("Unparseable frame during setup: {}", e),
        }
    }
    Err(SessionError::TransportError("connection ended during setup".into()))
}

async fn write_loop(mut write: WsWrite, mut outgoing: mpsc::Receiver<Message>) {
    while let Some(message) = outgoing.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = write.send(message).await {
            log::debug!("Gemini Live write failed: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
    let _ = write.close().await;
}

async fn read_loop(mut read: WsRead, events: mpsc::Sender<TransportEvent>) {
    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    log::warn!("Ignoring non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(reason)) => {
                log::info!("Gemini Live closed: {}", close_reason(reason.as_ref()));
                let _ = events.send(TransportEvent::Closed).await;
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                log::error!("Gemini Live read error: {}", e);
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                return;
            }
        };

        let message = match ServerMessage::parse(&text) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Ignoring unparseable Gemini frame: {}", e);
                continue;
            }
        };

        if let Some(ref go_away) = message.go_away {
            log::warn!(
                "Gemini Live will disconnect soon (time left: {})",
                go_away.time_left.as_deref().unwrap_or("unknown")
            );
        }

        for inbound in message.into_inbound() {
            if events.send(TransportEvent::Message(inbound)).await.is_err() {
                return;
            }
        }
    }
    let _ = events.send(TransportEvent::Closed).await;
}

fn close_reason(frame: Option<&tokio_tungstenite::tungstenite::protocol::CloseFrame<'_>>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => format!("{} ({})", frame.reason, frame.code),
        Some(frame) => frame.code.to_string(),
        None => "no reason".into(),
    }
}
