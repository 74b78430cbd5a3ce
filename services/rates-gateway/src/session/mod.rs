//! Client session handling
//!
//! Owns the lifecycle of one downstream WebSocket: assigns a subscriber
//! id, forwards control frames to the hub, and deregisters the subscriber
//! when the connection goes away. All business logic lives in the hub.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use services_common::MAX_CLIENT_FRAME_BYTES;

use crate::hub::{ClientConnection, SubscriptionHub};

/// Write half of a client socket, shared between the session loop and
/// publish sweeps
struct WsClientConnection {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl ClientConnection for WsClientConnection {
    async fn send_text(&self, text: &str) -> anyhow::Result<()> {
        self.sink.lock().await.send(Message::Text(text.to_string())).await?;
        Ok(())
    }
}

/// Upgrade an incoming request to a WebSocket session
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<SubscriptionHub>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_CLIENT_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Per-connection read loop
async fn handle_socket(socket: WebSocket, hub: Arc<SubscriptionHub>) {
    let subscriber_id = Uuid::new_v4();
    let (sink, mut stream) = socket.split();
    let conn: Arc<dyn ClientConnection> =
        Arc::new(WsClientConnection { sink: Mutex::new(sink) });

    info!("Subscriber {} connected", subscriber_id);

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                hub.process_message(&conn, subscriber_id, text.as_bytes()).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            // binary and ping/pong frames carry no control messages
            Ok(_) => {}
        }
    }

    hub.remove_subscriber(subscriber_id);
}
