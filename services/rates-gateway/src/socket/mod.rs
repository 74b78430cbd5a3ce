//! Upstream socket client
//!
//! Message-oriented duplex connection abstraction consumed by the feed
//! connector, with a tokio-tungstenite implementation. Connect attempts
//! are single-shot; retry policy belongs to the caller.

pub mod backoff;

pub use backoff::Backoff;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::info;

/// Transport-level socket failures
#[derive(Debug, Error)]
pub enum SocketError {
    /// Failed to establish the connection
    #[error("connect failed: {0}")]
    Connect(String),
    /// Operation attempted before a successful connect
    #[error("not connected")]
    NotConnected,
    /// Read failed or the peer closed the stream
    #[error("read failed: {0}")]
    Read(String),
    /// Write was not accepted by the transport
    #[error("write failed: {0}")]
    Write(String),
}

/// Bidirectional message-oriented connection
#[async_trait]
pub trait SocketClient: Send {
    /// Attempt to establish the connection once
    async fn connect(&mut self) -> Result<(), SocketError>;

    /// Read the next message, blocking until one arrives or the
    /// connection fails
    async fn read_message(&mut self) -> Result<Vec<u8>, SocketError>;

    /// Write one text frame
    async fn write_text(&mut self, payload: String) -> Result<(), SocketError>;

    /// Close the connection, discarding any transport error
    async fn close(&mut self);
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket implementation of [`SocketClient`]
pub struct WsSocketClient {
    url: String,
    stream: Option<WsStream>,
}

impl WsSocketClient {
    /// Create a client for the given URL; no connection is made until
    /// [`SocketClient::connect`].
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), stream: None }
    }
}

#[async_trait]
impl SocketClient for WsSocketClient {
    async fn connect(&mut self) -> Result<(), SocketError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SocketError::Connect(e.to_string()))?;
        info!("Connected to {}", self.url);
        self.stream = Some(stream);
        Ok(())
    }

    async fn read_message(&mut self) -> Result<Vec<u8>, SocketError> {
        let stream = self.stream.as_mut().ok_or(SocketError::NotConnected)?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.into_bytes()),
                Some(Ok(Message::Binary(payload))) => return Ok(payload),
                // tungstenite answers pings internally; keep reading
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SocketError::Read(e.to_string())),
                None => return Err(SocketError::Read("stream ended".to_string())),
            }
        }
    }

    async fn write_text(&mut self, payload: String) -> Result<(), SocketError> {
        let stream = self.stream.as_mut().ok_or(SocketError::NotConnected)?;
        stream
            .send(Message::Text(payload))
            .await
            .map_err(|e| SocketError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}
