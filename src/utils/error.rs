//! Error types shared across the session engine.
//!
//! Synchronous validation problems (bad topic, bad arguments) are returned at
//! the call site. Asynchronous failures surface through the future of the
//! request that hit them, or through the session's error notification when no
//! specific caller is waiting.

use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::transport::TransportError;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Topic name rejected by the topic grammar before anything was sent.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Inbound frame header could not be decoded.
    #[error("protocol decode error: {0}")]
    ProtocolDecode(ProtocolError),

    /// Inbound payload (or a subscription's typed view of it) could not be decoded.
    #[error("payload decode error: {0}")]
    PayloadDecode(String),

    #[error("request {request_id} on {topic} timed out after {timeout_ms} ms")]
    RequestTimeout {
        topic: String,
        request_id: String,
        timeout_ms: u64,
    },

    /// The remote side answered with an `error` payload.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A subscription callback panicked while handling a frame.
    #[error("handler for {0} panicked")]
    Handler(String),

    #[error("not connected")]
    NotConnected,

    #[error("max reconnect attempts exceeded ({attempts})")]
    ReconnectExhausted { attempts: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl SessionError {
    pub fn invalid_topic(topic: impl Into<String>) -> Self {
        Self::InvalidTopic(topic.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// True for the failure kinds produced while decoding an inbound frame.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::ProtocolDecode(_) | Self::PayloadDecode(_))
    }
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Payload(e) => Self::PayloadDecode(e.to_string()),
            other => Self::ProtocolDecode(other),
        }
    }
}
