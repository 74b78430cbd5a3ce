//! Canonical market data types

use serde::{Deserialize, Serialize};

/// Normalized rate update for one instrument
///
/// The canonical internal shape for a price update, independent of the
/// upstream wire format. Field names are the downstream wire names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateUpdate {
    /// Instrument symbol, e.g. "BTC/USD"
    pub symbol: String,
    /// Capture timestamp in unix seconds, stamped at normalization time
    pub timestamp: i64,
    /// Best bid price
    pub bid: f64,
    /// Best ask price
    pub ask: f64,
    /// Last traded price
    pub spot: f64,
    /// 24h change in percent
    pub change: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_with_wire_field_names() {
        let update = RateUpdate {
            symbol: "BTC/USD".to_string(),
            timestamp: 1_700_000_000,
            bid: 30000.0,
            ask: 31000.0,
            spot: 30500.0,
            change: 0.5,
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "symbol": "BTC/USD",
                "timestamp": 1_700_000_000,
                "bid": 30000.0,
                "ask": 31000.0,
                "spot": 30500.0,
                "change": 0.5,
            })
        );
    }
}
