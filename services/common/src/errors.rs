//! Protocol-level error types
//!
//! The `Display` strings are the exact texts sent to clients in error
//! frames.

use thiserror::Error;

/// Errors a hub operation can surface to a client
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HubError {
    /// The requested channel is not in the fixed channel set
    #[error("channel not supported")]
    ChannelNotSupported,
}
