//! The `protocol` module defines the text framing spoken with the broker.
//!
//! Every frame is a header line followed by a newline and a JSON payload.
//! The header carries the action, topic, protocol version and, for
//! correlated traffic, the request identifier.

pub mod codec;
pub mod header;
pub mod message;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use codec::{decode, encode};
pub use header::{Action, Header};
pub use message::Message;

/// Protocol version spoken by this client.
pub const PROTOCOL_VERSION: &str = "1.0.0";

pub const HEARTBEAT_TOPIC: &str = "system.heartbeat";
pub const REGISTER_TOPIC: &str = "system.service.register";
pub const SUBSCRIBE_TOPIC: &str = "system.topic.subscribe";
pub const UNSUBSCRIBE_TOPIC: &str = "system.topic.unsubscribe";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("frame has no header/payload separator")]
    MissingNewline,

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unknown action {0:?}")]
    UnknownAction(String),

    #[error("invalid topic {0:?}")]
    InvalidTopic(String),

    #[error("invalid version {0:?}")]
    InvalidVersion(String),

    #[error("unsupported protocol version {version} (client speaks {current})")]
    UnsupportedVersion { version: String, current: String },

    #[error("request id {0:?} is not a valid UUID")]
    InvalidRequestId(String),

    #[error("payload is not valid JSON: {0}")]
    Payload(#[source] serde_json::Error),
}

/// A three-component `major.minor.patch` protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// True when `other` lies in `[self, (self.major + 1).0.0)`.
    pub fn accepts(&self, other: &Version) -> bool {
        other >= self && other.major <= self.major
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::new(1, 0, 0)
    }
}

impl FromStr for Version {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidVersion(s.to_string());
        let mut parts = s.split('.');
        let mut next = || -> Result<u64, ProtocolError> {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(invalid)
        };
        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
