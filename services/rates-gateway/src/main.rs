//! Rates Gateway Service
//!
//! Wires the upstream Kraken feed, the publish queue, the subscription hub
//! and the subscriber WebSocket endpoint together.

use std::sync::Arc;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rates_gateway::exchanges::kraken::KrakenFeed;
use rates_gateway::hub::SubscriptionHub;
use rates_gateway::session::ws_handler;
use rates_gateway::socket::WsSocketClient;
use services_common::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rates_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    info!("Starting rates gateway");

    let hub = Arc::new(SubscriptionHub::new(&config.channels));
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let cancel = CancellationToken::new();

    // upstream feed: reconnects internally, only a subscribe failure ends it
    let feed_cancel = cancel.clone();
    let upstream = config.upstream.clone();
    tokio::spawn(async move {
        let client = WsSocketClient::new(upstream.url.clone());
        let mut feed = KrakenFeed::new(client, upstream);
        if let Err(e) = feed.run(tx, feed_cancel).await {
            error!("Upstream feed terminated: {}", e);
        }
    });

    tokio::spawn(Arc::clone(&hub).run_broadcast(rx, cancel.clone()));

    let app = Router::new().route("/ws", get(ws_handler)).with_state(hub);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Listening for subscribers on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    info!("Gateway shut down");
    Ok(())
}

/// Resolve on ctrl-c, cancelling the background loops
async fn shutdown_signal(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        error!("Failed to install shutdown signal handler");
        return;
    }
    info!("Shutdown signal received");
    cancel.cancel();
}
