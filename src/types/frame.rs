use serde::{Deserialize, Serialize};

/// Message type emitted locally when the transport opens.
pub const CONNECTION_OPEN: &str = "connection.open";
/// Message type emitted locally on a transport-level error.
pub const CONNECTION_ERROR: &str = "connection.error";
/// Message type emitted locally when the transport closes.
pub const CONNECTION_CLOSE: &str = "connection.close";
/// Message type emitted locally when reconnect attempts are exhausted.
pub const CONNECTION_FAILED: &str = "connection.failed";

/// Application-level heartbeat frame type.
pub const PING: &str = "ping";

/// JSON envelope exchanged over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl WireFrame {
    #[must_use]
    pub fn new(frame_type: impl Into<String>, data: serde_json::Value, timestamp: i64) -> Self {
        Self {
            frame_type: frame_type.into(),
            data,
            timestamp,
        }
    }

    /// Reserved types are emitted by the connection manager itself and never
    /// written to the wire.
    #[must_use]
    pub fn is_reserved_type(frame_type: &str) -> bool {
        matches!(
            frame_type,
            CONNECTION_OPEN | CONNECTION_ERROR | CONNECTION_CLOSE | CONNECTION_FAILED
        )
    }
}

pub fn parse_frame(text: &str) -> Result<WireFrame, serde_json::Error> {
    serde_json::from_str(text)
}
