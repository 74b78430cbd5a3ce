//! Constants shared across the gateway
//!
//! Single source of truth for channel names, instrument lists and tuning
//! defaults.

/// Channel carrying normalized rate updates
pub const RATES_CHANNEL: &str = "rates";

/// The fixed set of channels clients may subscribe to
pub const SUPPORTED_CHANNELS: &[&str] = &[RATES_CHANNEL];

/// Default upstream WebSocket endpoint (Kraken v2)
pub const DEFAULT_UPSTREAM_URL: &str = "wss://ws.kraken.com/v2";

/// Default address the gateway listens on for subscriber connections
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

// Reconnect backoff
/// Initial delay between upstream reconnect attempts
pub const DEFAULT_BACKOFF_INITIAL_SECS: u64 = 2;
/// Cap on the reconnect delay
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 30;

/// Capacity of the publish queue between the feed and the broadcast loop
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Largest control frame a client may send
pub const MAX_CLIENT_FRAME_BYTES: usize = 512;

/// Instruments subscribed on the upstream ticker stream
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "BTC/USD", "ETH/USD", "LTC/USD", "XRP/USD", "BCH/USD", "USDC/USD", "XMR/USD", "XLM/USD",
    "USDT/USD", "QCAD/USD", "DOGE/USD", "LINK/USD", "MATIC/USD", "UNI/USD", "COMP/USD", "AAVE/USD",
    "DAI/USD", "SUSHI/USD", "SNX/USD", "CRV/USD", "DOT/USD", "YFI/USD", "MKR/USD", "PAXG/USD",
    "ADA/USD", "BAT/USD", "ENJ/USD", "AXS/USD", "DASH/USD", "EOS/USD", "BAL/USD", "KNC/USD",
    "ZRX/USD", "SAND/USD", "GRT/USD", "QNT/USD", "ETC/USD", "ETHW/USD", "1INCH/USD", "CHZ/USD",
    "CHR/USD", "SUPER/USD", "ELF/USD", "OMG/USD", "FTM/USD", "MANA/USD", "SOL/USD", "ALGO/USD",
    "LUNC/USD", "UST/USD", "ZEC/USD", "XTZ/USD", "AMP/USD", "REN/USD", "UMA/USD", "SHIB/USD",
    "LRC/USD", "ANKR/USD", "HBAR/USD", "EGLD/USD", "AVAX/USD", "ONE/USD", "GALA/USD", "ALICE/USD",
    "ATOM/USD", "DYDX/USD", "CELO/USD", "STORJ/USD", "SKL/USD", "CTSI/USD", "BAND/USD", "ENS/USD",
    "RNDR/USD", "MASK/USD", "APE/USD",
];
