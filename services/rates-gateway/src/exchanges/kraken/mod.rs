//! Kraken v2 ticker feed connector
//!
//! Maintains the upstream connection through a connect → subscribe →
//! stream loop. Connect failures retry with capped exponential backoff; a
//! read error mid-stream restarts the whole session, re-issuing the
//! subscription. Ticker records are normalized one at a time into
//! [`RateUpdate`]s with a fresh capture timestamp and handed to the
//! publish queue.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use services_common::{RateUpdate, UpstreamConfig};

use super::FeedError;
use crate::socket::{Backoff, SocketClient};

/// Upstream channel carrying ticker updates
const TICKER_CHANNEL: &str = "ticker";

/// Outbound subscribe request
#[derive(Debug, Serialize)]
pub struct TickerSubscribe {
    /// Always "subscribe"
    pub method: String,
    /// Stream selection
    pub params: SubscribeParams,
}

/// Parameters of a subscribe request
#[derive(Debug, Serialize)]
pub struct SubscribeParams {
    /// Stream name, "ticker"
    pub channel: String,
    /// Instruments to receive updates for
    pub symbol: Vec<String>,
}

/// Inbound stream envelope
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TickerEnvelope {
    /// Stream the payload belongs to; empty for control traffic
    pub channel: String,
    /// Update kind reported by the exchange ("snapshot" or "update")
    #[serde(rename = "type")]
    pub kind: String,
    /// One record per instrument
    pub data: Vec<TickerData>,
}

/// One instrument record on the ticker stream
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TickerData {
    /// Instrument symbol
    pub symbol: String,
    /// Best bid price
    pub bid: f64,
    /// Best ask price
    pub ask: f64,
    /// Last traded price
    pub last: f64,
    /// 24h change in percent
    pub change_pct: f64,
}

/// Resilient client for the Kraken ticker stream
pub struct KrakenFeed<C: SocketClient> {
    client: C,
    config: UpstreamConfig,
}

impl<C: SocketClient> KrakenFeed<C> {
    /// Create a feed over the given socket client
    pub fn new(client: C, config: UpstreamConfig) -> Self {
        Self { client, config }
    }

    /// Connect, subscribe and stream until cancelled
    ///
    /// Reconnects with fresh backoff after any read error. Returns `Ok(())`
    /// on cancellation or when the publish queue closes; the only error is
    /// a failed subscribe on a fresh connection.
    pub async fn run(
        &mut self,
        tx: mpsc::Sender<RateUpdate>,
        cancel: CancellationToken,
    ) -> Result<(), FeedError> {
        loop {
            if !self.connect_with_backoff(&cancel).await {
                return Ok(());
            }

            self.send_subscribe().await?;
            info!("Subscribed to {} instruments on the ticker stream", self.config.symbols.len());

            loop {
                let message = tokio::select! {
                    () = cancel.cancelled() => None,
                    message = self.client.read_message() => Some(message),
                };

                match message {
                    None => {
                        info!("Cancellation received, closing upstream connection");
                        self.client.close().await;
                        return Ok(());
                    }
                    Some(Ok(payload)) => {
                        if !self.dispatch(&payload, &tx).await {
                            self.client.close().await;
                            return Ok(());
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Upstream read failed: {}; reconnecting", e);
                        self.client.close().await;
                        break;
                    }
                }
            }
        }
    }

    /// Retry connecting until it succeeds or the token is cancelled;
    /// returns false on cancellation.
    async fn connect_with_backoff(&mut self, cancel: &CancellationToken) -> bool {
        let mut backoff = Backoff::new(self.config.backoff_initial, self.config.backoff_max);
        loop {
            if cancel.is_cancelled() {
                return false;
            }

            let error = match self.client.connect().await {
                Ok(()) => return true,
                Err(e) => e,
            };

            let delay = backoff.next_delay();
            warn!("Upstream connect failed: {}; retrying in {:?}", error, delay);
            let cancelled = tokio::select! {
                () = cancel.cancelled() => true,
                () = sleep(delay) => false,
            };
            if cancelled {
                return false;
            }
        }
    }

    async fn send_subscribe(&mut self) -> Result<(), FeedError> {
        let request = TickerSubscribe {
            method: "subscribe".to_string(),
            params: SubscribeParams {
                channel: TICKER_CHANNEL.to_string(),
                symbol: self.config.symbols.clone(),
            },
        };
        let payload = serde_json::to_string(&request)?;
        self.client.write_text(payload).await?;
        Ok(())
    }

    /// Decode one upstream payload and queue its records; returns false
    /// once the publish queue has closed.
    async fn dispatch(&self, payload: &[u8], tx: &mpsc::Sender<RateUpdate>) -> bool {
        let envelope: TickerEnvelope = match serde_json::from_slice(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Dropping undecodable upstream payload: {}", e);
                return true;
            }
        };

        if envelope.channel != TICKER_CHANNEL {
            return true;
        }

        let timestamp = Utc::now().timestamp();
        for ticker in envelope.data {
            let update = RateUpdate {
                symbol: ticker.symbol,
                timestamp,
                bid: ticker.bid,
                ask: ticker.ask,
                spot: ticker.last,
                change: ticker.change_pct,
            };
            if tx.send(update).await.is_err() {
                warn!("Publish queue closed, stopping feed");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::SocketError;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const TICKER_PAYLOAD: &str = r#"{"channel":"ticker","type":"update","data":[{"symbol":"BTC/USD","bid":30000.0,"ask":31000.0,"last":30500.0,"change_pct":0.5}]}"#;

    /// Socket double driven by canned connect/read results
    struct ScriptedSocket {
        connects: VecDeque<Result<(), SocketError>>,
        reads: VecDeque<Result<Vec<u8>, SocketError>>,
        writes: Arc<parking_lot::Mutex<Vec<String>>>,
        fail_writes: bool,
    }

    impl ScriptedSocket {
        fn new(
            connects: Vec<Result<(), SocketError>>,
            reads: Vec<Result<Vec<u8>, SocketError>>,
        ) -> Self {
            Self {
                connects: connects.into(),
                reads: reads.into(),
                writes: Arc::new(parking_lot::Mutex::new(Vec::new())),
                fail_writes: false,
            }
        }

        fn writes(&self) -> Arc<parking_lot::Mutex<Vec<String>>> {
            Arc::clone(&self.writes)
        }
    }

    #[async_trait::async_trait]
    impl SocketClient for ScriptedSocket {
        async fn connect(&mut self) -> Result<(), SocketError> {
            self.connects
                .pop_front()
                .unwrap_or_else(|| Err(SocketError::Connect("scripted refusal".to_string())))
        }

        async fn read_message(&mut self) -> Result<Vec<u8>, SocketError> {
            match self.reads.pop_front() {
                Some(result) => result,
                // script exhausted: park until the feed is cancelled
                None => {
                    sleep(Duration::from_secs(3600)).await;
                    Err(SocketError::Read("idle".to_string()))
                }
            }
        }

        async fn write_text(&mut self, payload: String) -> Result<(), SocketError> {
            if self.fail_writes {
                return Err(SocketError::Write("scripted failure".to_string()));
            }
            self.writes.lock().push(payload);
            Ok(())
        }

        async fn close(&mut self) {}
    }

    fn test_config() -> UpstreamConfig {
        UpstreamConfig {
            url: "wss://example.invalid/v2".to_string(),
            symbols: vec!["BTC/USD".to_string(), "ETH/USD".to_string()],
            backoff_initial: Duration::from_millis(10),
            backoff_max: Duration::from_millis(40),
        }
    }

    #[tokio::test]
    async fn maps_ticker_records_to_rate_updates() {
        let socket = ScriptedSocket::new(vec![Ok(())], vec![Ok(TICKER_PAYLOAD.into())]);
        let writes = socket.writes();
        let mut feed = KrakenFeed::new(socket, test_config());
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { feed.run(tx, token).await });

        let update = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(update.symbol, "BTC/USD");
        assert_eq!(update.bid, 30000.0);
        assert_eq!(update.ask, 31000.0);
        assert_eq!(update.spot, 30500.0);
        assert_eq!(update.change, 0.5);
        assert!(update.timestamp > 0);

        cancel.cancel();
        let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(result.is_ok());

        let writes = writes.lock();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].contains(r#""method":"subscribe""#));
        assert!(writes[0].contains(r#""channel":"ticker""#));
        assert!(writes[0].contains("BTC/USD"));
    }

    #[tokio::test]
    async fn non_ticker_and_undecodable_payloads_produce_no_events() {
        let socket = ScriptedSocket::new(
            vec![Ok(())],
            vec![
                Ok(b"not json at all".to_vec()),
                Ok(br#"{"channel":"heartbeat"}"#.to_vec()),
                Ok(TICKER_PAYLOAD.into()),
            ],
        );
        let mut feed = KrakenFeed::new(socket, test_config());
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { feed.run(tx, token).await });

        // the first event out of the queue is from the ticker payload:
        // the two preceding frames were dropped without output or error
        let update = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(update.symbol, "BTC/USD");

        cancel.cancel();
        assert!(timeout(Duration::from_secs(1), handle).await.unwrap().unwrap().is_ok());
    }

    #[tokio::test]
    async fn subscribe_send_failure_is_fatal() {
        let mut socket = ScriptedSocket::new(vec![Ok(())], vec![]);
        socket.fail_writes = true;
        let mut feed = KrakenFeed::new(socket, test_config());
        let (tx, _rx) = mpsc::channel(16);

        let result = feed.run(tx, CancellationToken::new()).await;

        assert!(matches!(result, Err(FeedError::Subscribe(_))));
    }

    #[tokio::test]
    async fn reconnects_and_resubscribes_after_read_error() {
        let socket = ScriptedSocket::new(
            vec![Ok(()), Ok(())],
            vec![
                Ok(TICKER_PAYLOAD.into()),
                Err(SocketError::Read("connection reset".to_string())),
                Ok(TICKER_PAYLOAD.into()),
            ],
        );
        let writes = socket.writes();
        let mut feed = KrakenFeed::new(socket, test_config());
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { feed.run(tx, token).await });

        let first = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.symbol, second.symbol);

        cancel.cancel();
        assert!(timeout(Duration::from_secs(1), handle).await.unwrap().unwrap().is_ok());

        // one subscribe request per session
        assert_eq!(writes.lock().len(), 2);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_returns_promptly() {
        let socket = ScriptedSocket::new(vec![], vec![]);
        let config = UpstreamConfig {
            backoff_initial: Duration::from_secs(60),
            backoff_max: Duration::from_secs(60),
            ..test_config()
        };
        let mut feed = KrakenFeed::new(socket, config);
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { feed.run(tx, token).await });

        sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        // returns well before the 60s backoff elapses
        let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn envelope_decodes_with_partial_fields() {
        let envelope: TickerEnvelope =
            serde_json::from_str(r#"{"channel":"ticker","data":[{"symbol":"SOL/USD"}]}"#).unwrap();

        assert_eq!(envelope.channel, "ticker");
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.data[0].symbol, "SOL/USD");
        assert_eq!(envelope.data[0].bid, 0.0);
    }
}
