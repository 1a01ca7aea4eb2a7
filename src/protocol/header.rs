//! Frame headers
//!
//! A header is the first line of every frame:
//! `ACTION:topic:version[:requestId[:parentRequestId[:timeoutMs]]]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ProtocolError;

/// The role a frame plays in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Publish,
    Request,
    Response,
}

impl Action {
    /// Upper-case wire token.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Action::Publish => "PUBLISH",
            Action::Request => "REQUEST",
            Action::Response => "RESPONSE",
        }
    }

    /// Lower-case token used for subscription routing keys.
    pub fn as_key(&self) -> &'static str {
        match self {
            Action::Publish => "publish",
            Action::Request => "request",
            Action::Response => "response",
        }
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PUBLISH" => Ok(Action::Publish),
            "REQUEST" => Ok(Action::Request),
            "RESPONSE" => Ok(Action::Response),
            _ => Err(ProtocolError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub action: Action,
    pub topic: String,
    pub version: String,
    pub request_id: Option<String>,
    /// Outbound only: the request this one was issued on behalf of.
    pub parent_request_id: Option<String>,
    /// Outbound only: how long the sender will wait, in milliseconds.
    pub timeout: Option<u64>,
}

impl Header {
    pub fn new(action: Action, topic: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            action,
            topic: topic.into(),
            version: version.into(),
            request_id: None,
            parent_request_id: None,
            timeout: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_parent_request_id(mut self, parent: Option<String>) -> Self {
        self.parent_request_id = parent;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout = timeout_ms;
        self
    }

    /// Header of the RESPONSE answering a frame carrying this header.
    pub fn response(&self) -> Self {
        Self {
            action: Action::Response,
            topic: self.topic.clone(),
            version: self.version.clone(),
            request_id: self.request_id.clone(),
            parent_request_id: None,
            timeout: None,
        }
    }

    /// Renders the header line. Each optional field forces the ones before
    /// it onto the wire, as empty placeholders if unset.
    pub fn to_wire(&self) -> String {
        let mut line = format!("{}:{}:{}", self.action.as_wire(), self.topic, self.version);

        let timeout = self.timeout.map(|t| t.to_string());
        let tail = [
            self.request_id.as_deref(),
            self.parent_request_id.as_deref(),
            timeout.as_deref(),
        ];
        let emitted = tail.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
        for field in &tail[..emitted] {
            line.push(':');
            line.push_str(field.unwrap_or(""));
        }
        line
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}
