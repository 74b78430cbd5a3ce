//! Gateway configuration
//!
//! Static configuration with compiled-in defaults and environment-variable
//! overrides. The topic set and instrument list are fixed at startup.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_INITIAL_SECS, DEFAULT_BACKOFF_MAX_SECS, DEFAULT_LISTEN_ADDR,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SYMBOLS, DEFAULT_UPSTREAM_URL, SUPPORTED_CHANNELS,
};

/// Upstream feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// WebSocket URL of the exchange feed
    pub url: String,
    /// Instruments to subscribe to on the ticker stream
    pub symbols: Vec<String>,
    /// Initial reconnect delay
    pub backoff_initial: Duration,
    /// Maximum reconnect delay
    pub backoff_max: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| (*s).to_string()).collect(),
            backoff_initial: Duration::from_secs(DEFAULT_BACKOFF_INITIAL_SECS),
            backoff_max: Duration::from_secs(DEFAULT_BACKOFF_MAX_SECS),
        }
    }
}

/// Gateway service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address to bind the subscriber endpoint on
    pub listen_addr: String,
    /// Channels clients may subscribe to
    pub channels: Vec<String>,
    /// Capacity of the publish queue between feed and broadcast loop
    pub queue_capacity: usize,
    /// Upstream feed settings
    pub upstream: UpstreamConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            channels: SUPPORTED_CHANNELS.iter().map(|c| (*c).to_string()).collect(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = env::var("GATEWAY_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(capacity) = env::var("GATEWAY_QUEUE_CAPACITY") {
            if let Ok(capacity) = capacity.parse() {
                config.queue_capacity = capacity;
            }
        }
        if let Ok(url) = env::var("UPSTREAM_WS_URL") {
            config.upstream.url = url;
        }
        if let Ok(symbols) = env::var("UPSTREAM_SYMBOLS") {
            let symbols: Vec<String> = symbols
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !symbols.is_empty() {
                config.upstream.symbols = symbols;
            }
        }

        config
    }
}
