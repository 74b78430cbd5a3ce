//! Exchange feed connectors

pub mod kraken;

use thiserror::Error;

use crate::socket::SocketError;

/// Errors that terminate a feed connector invocation
///
/// Connect and read failures are retried inside the connector and never
/// surface here; only a failed subscribe on a fresh connection is fatal.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The subscribe request could not be sent
    #[error("upstream subscribe failed: {0}")]
    Subscribe(#[from] SocketError),
    /// The subscribe request could not be encoded
    #[error("encoding subscribe request: {0}")]
    Encode(#[from] serde_json::Error),
}
