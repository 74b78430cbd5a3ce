//! Downstream protocol frames
//!
//! JSON messages exchanged with subscribers over text frames.

use serde::{Deserialize, Serialize};

/// Event name on a subscribe request
pub const SUBSCRIBE_EVENT: &str = "subscribe";
/// Event name on a subscribe acknowledgement
pub const SUBSCRIBED_EVENT: &str = "subscribed";
/// Event name on an unsubscribe request
pub const UNSUBSCRIBE_EVENT: &str = "unsubscribe";
/// Event name on an unsubscribe acknowledgement
pub const UNSUBSCRIBED_EVENT: &str = "unsubscribed";
/// Event name on a broadcast data frame
pub const DATA_EVENT: &str = "data";

/// Control frame, used both for client requests and acknowledgements
///
/// Fields default to empty strings so partial JSON still decodes; the hub
/// rejects the result by event/channel value rather than by shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFrame {
    /// Requested or acknowledged event
    #[serde(default)]
    pub event: String,
    /// Channel the event applies to
    #[serde(default)]
    pub channel: String,
}

/// Error frame sent to a client when a request cannot be honored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Human-readable failure text
    pub error_message: String,
}

/// Broadcast frame carrying one payload for a channel
#[derive(Debug, Serialize)]
pub struct DataFrame<'a, T> {
    /// Always [`DATA_EVENT`]
    pub event: &'a str,
    /// Channel the payload belongs to
    pub channel: &'a str,
    /// The payload itself
    pub data: &'a T,
}
