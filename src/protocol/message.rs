//! Decoded messages
//!
//! `Message` pairs a frame header with its payload. The payload defaults to
//! an untyped `serde_json::Value`; subscriptions decode it into the shape the
//! subscriber asked for via [`Message::decode`].
//!
//! Notes on fields:
//! - `header`: routing information exactly as received
//! - `payload`: the JSON body
//! - `received_at`: local wall-clock time the frame was decoded

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::header::Header;

/// Name of the payload field that marks a frame as a failure.
pub const ERROR_FIELD: &str = "error";

#[derive(Debug, Clone, PartialEq)]
pub struct Message<T = Value> {
    pub header: Header,
    pub payload: T,
    pub received_at: DateTime<Utc>,
}

impl<T> Message<T> {
    pub fn request_id(&self) -> Option<&str> {
        self.header.request_id.as_deref()
    }

    pub fn topic(&self) -> &str {
        &self.header.topic
    }
}

impl Message<Value> {
    pub fn new(header: Header, payload: Value) -> Self {
        Self {
            header,
            payload,
            received_at: Utc::now(),
        }
    }

    /// The remote error description, if the payload carries an `error` field.
    ///
    /// Accepts either a bare string or an object with a `message` string;
    /// anything else is rendered as JSON.
    pub fn error_message(&self) -> Option<String> {
        let error = self.payload.get(ERROR_FIELD)?;
        Some(match error {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("message") {
                Some(Value::String(s)) => s.clone(),
                _ => error.to_string(),
            },
            other => other.to_string(),
        })
    }

    pub fn is_error(&self) -> bool {
        self.payload.get(ERROR_FIELD).is_some()
    }

    /// Decodes the payload into `T`, keeping header and timestamp.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Message<T>, serde_json::Error> {
        let payload = T::deserialize(&self.payload)?;
        Ok(Message {
            header: self.header.clone(),
            payload,
            received_at: self.received_at,
        })
    }
}
