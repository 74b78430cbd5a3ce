//! Subscription hub
//!
//! Concurrent registry of channel → subscriber-set with publish fan-out.
//! Each channel's registry has its own lock so traffic on unrelated
//! channels never contends; the channel set itself is fixed at startup and
//! the outer map is never mutated. Subscribers that fail a write during a
//! publish sweep are evicted from every channel, which is the only
//! mechanism by which dead connections are garbage-collected.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use services_common::{HubError, RateUpdate, RATES_CHANNEL};

use crate::models::{
    ControlFrame, DataFrame, ErrorFrame, DATA_EVENT, SUBSCRIBED_EVENT, SUBSCRIBE_EVENT,
    UNSUBSCRIBED_EVENT, UNSUBSCRIBE_EVENT,
};

/// Unique identifier minted per downstream connection
pub type SubscriberId = Uuid;

/// Write side of a downstream connection
///
/// The hub holds a non-owning handle per subscriber; the session task owns
/// the connection's lifecycle and closes it.
#[async_trait]
pub trait ClientConnection: Send + Sync {
    /// Write one text frame to the client
    async fn send_text(&self, text: &str) -> anyhow::Result<()>;
}

type Registry = FxHashMap<SubscriberId, Arc<dyn ClientConnection>>;

/// Channel → subscriber-set registry with per-channel locking
pub struct SubscriptionHub {
    channels: FxHashMap<String, Mutex<Registry>>,
}

impl SubscriptionHub {
    /// Create a hub for a fixed set of channels
    pub fn new(channels: &[String]) -> Self {
        let channels = channels
            .iter()
            .map(|name| (name.clone(), Mutex::new(Registry::default())))
            .collect();
        Self { channels }
    }

    /// Register a subscriber on a channel
    ///
    /// Re-subscribing overwrites the existing entry and is not an error.
    pub fn subscribe(
        &self,
        conn: Arc<dyn ClientConnection>,
        id: SubscriberId,
        channel: &str,
    ) -> Result<(), HubError> {
        let registry = self.channels.get(channel).ok_or(HubError::ChannelNotSupported)?;
        registry.lock().insert(id, conn);
        Ok(())
    }

    /// Remove a subscriber from a channel
    ///
    /// Removing an entry that is not present is a silent no-op.
    pub fn unsubscribe(&self, id: SubscriberId, channel: &str) -> Result<(), HubError> {
        let registry = self.channels.get(channel).ok_or(HubError::ChannelNotSupported)?;
        registry.lock().remove(&id);
        Ok(())
    }

    /// Remove a subscriber from every channel
    ///
    /// Called on connection teardown or terminal write failure. Safe to
    /// call any number of times.
    pub fn remove_subscriber(&self, id: SubscriberId) {
        for registry in self.channels.values() {
            registry.lock().remove(&id);
        }
        info!("Subscriber {} disconnected", id);
    }

    /// Number of subscribers currently registered on a channel
    ///
    /// Unknown channels report zero.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |registry| registry.lock().len())
    }

    /// Whether a subscriber is currently registered on a channel
    pub fn is_subscribed(&self, id: SubscriberId, channel: &str) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|registry| registry.lock().contains_key(&id))
    }

    /// Broadcast a payload to every subscriber of a channel
    ///
    /// No-op for unknown channels and channels with no subscribers. The
    /// subscriber list is snapshotted under the channel lock and the lock
    /// released before any write, so a slow client never blocks registry
    /// mutation. Subscribers whose write fails are treated as disconnected
    /// and evicted from every channel.
    pub async fn publish<T: Serialize>(&self, channel: &str, data: &T) {
        let Some(registry) = self.channels.get(channel) else {
            return;
        };

        let snapshot: Vec<(SubscriberId, Arc<dyn ClientConnection>)> = {
            let guard = registry.lock();
            if guard.is_empty() {
                return;
            }
            guard.iter().map(|(id, conn)| (*id, Arc::clone(conn))).collect()
        };

        let frame = DataFrame { event: DATA_EVENT, channel, data };
        let payload = match serde_json::to_string(&frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize broadcast for {}: {}", channel, e);
                return;
            }
        };

        let mut failed = Vec::new();
        for (id, conn) in snapshot {
            if let Err(e) = conn.send_text(&payload).await {
                debug!("Write to subscriber {} failed: {}", id, e);
                failed.push(id);
            }
        }

        for id in failed {
            self.remove_subscriber(id);
        }
    }

    /// Handle one control frame from a client
    ///
    /// Malformed payloads and unknown events are answered with an error
    /// frame and leave the registries untouched.
    pub async fn process_message(
        &self,
        conn: &Arc<dyn ClientConnection>,
        id: SubscriberId,
        raw: &[u8],
    ) {
        let request: ControlFrame = match serde_json::from_slice(raw) {
            Ok(request) => request,
            Err(e) => {
                debug!("Undecodable frame from subscriber {}: {}", id, e);
                self.send_error(conn, "invalid request format").await;
                return;
            }
        };

        let event = request.event.trim().to_ascii_lowercase();
        match event.as_str() {
            SUBSCRIBE_EVENT => match self.subscribe(Arc::clone(conn), id, &request.channel) {
                Ok(()) => {
                    self.send_ack(conn, SUBSCRIBED_EVENT, &request.channel).await;
                    info!("Subscriber {} subscribed to {}", id, request.channel);
                }
                Err(e) => self.send_error(conn, &e.to_string()).await,
            },
            UNSUBSCRIBE_EVENT => match self.unsubscribe(id, &request.channel) {
                Ok(()) => {
                    self.send_ack(conn, UNSUBSCRIBED_EVENT, &request.channel).await;
                    info!("Subscriber {} unsubscribed from {}", id, request.channel);
                }
                Err(e) => self.send_error(conn, &e.to_string()).await,
            },
            _ => self.send_error(conn, "unsupported event").await,
        }
    }

    /// Drain the publish queue, broadcasting each update on the rates
    /// channel until cancelled or the queue closes.
    pub async fn run_broadcast(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<RateUpdate>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Broadcast loop received cancellation signal");
                    return;
                }
                update = rx.recv() => match update {
                    Some(update) => self.publish(RATES_CHANNEL, &update).await,
                    None => {
                        info!("Broadcast queue closed");
                        return;
                    }
                },
            }
        }
    }

    async fn send_ack(&self, conn: &Arc<dyn ClientConnection>, event: &str, channel: &str) {
        let ack = ControlFrame { event: event.to_string(), channel: channel.to_string() };
        self.send_json(conn, &ack).await;
    }

    async fn send_error(&self, conn: &Arc<dyn ClientConnection>, message: &str) {
        let frame = ErrorFrame { error_message: message.to_string() };
        self.send_json(conn, &frame).await;
    }

    async fn send_json<T: Serialize>(&self, conn: &Arc<dyn ClientConnection>, value: &T) {
        match serde_json::to_string(value) {
            Ok(payload) => {
                if let Err(e) = conn.send_text(&payload).await {
                    debug!("Control write failed: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize control frame: {}", e),
        }
    }
}
