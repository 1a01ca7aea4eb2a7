//! Frame codec
//!
//! Encodes a header and JSON payload into a single text frame and back:
//!
//! ```text
//! PUBLISH:metrics.tick:1.0.0
//! {"n":1}
//! ```
//!
//! Decoding is strict about the header (action, topic grammar, version
//! compatibility, request id syntax) and reports payload JSON failures as a
//! separate error kind so callers can tell the two apart.

use serde_json::Value;
use uuid::Uuid;

use super::header::{Action, Header};
use super::message::Message;
use super::{ProtocolError, Version};
use crate::topic;

const MIN_HEADER_FIELDS: usize = 3;
const MAX_HEADER_FIELDS: usize = 6;

pub fn encode(header: &Header, payload: &Value) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string(payload)?;
    Ok(format!("{}\n{}", header.to_wire(), body))
}

/// Decodes a raw frame, accepting protocol versions compatible with `current`.
pub fn decode(raw: &str, current: &Version) -> Result<Message, ProtocolError> {
    let (line, body) = raw.split_once('\n').ok_or(ProtocolError::MissingNewline)?;
    let header = decode_header(line.trim_end_matches('\r'), current)?;

    let payload = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).map_err(ProtocolError::Payload)?
    };

    Ok(Message::new(header, payload))
}

pub fn decode_header(line: &str, current: &Version) -> Result<Header, ProtocolError> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < MIN_HEADER_FIELDS || fields.len() > MAX_HEADER_FIELDS {
        return Err(ProtocolError::MalformedHeader(format!(
            "expected {MIN_HEADER_FIELDS} to {MAX_HEADER_FIELDS} fields, got {}",
            fields.len()
        )));
    }

    let action: Action = fields[0].parse()?;

    let topic = fields[1];
    if !topic::is_valid(topic) {
        return Err(ProtocolError::InvalidTopic(topic.to_string()));
    }

    let version = fields[2];
    let parsed: Version = version.parse()?;
    if !current.accepts(&parsed) {
        return Err(ProtocolError::UnsupportedVersion {
            version: version.to_string(),
            current: current.to_string(),
        });
    }

    let optional = |idx: usize| fields.get(idx).copied().filter(|f| !f.is_empty());

    let request_id = match optional(3) {
        Some(id) => {
            Uuid::parse_str(id).map_err(|_| ProtocolError::InvalidRequestId(id.to_string()))?;
            Some(id.to_string())
        }
        None => None,
    };

    let parent_request_id = optional(4).map(str::to_string);

    let timeout = match optional(5) {
        Some(t) => Some(t.parse::<u64>().map_err(|_| {
            ProtocolError::MalformedHeader(format!("timeout is not an integer: {t:?}"))
        })?),
        None => None,
    };

    Ok(Header {
        action,
        topic: topic.to_string(),
        version: version.to_string(),
        request_id,
        parent_request_id,
        timeout,
    })
}
