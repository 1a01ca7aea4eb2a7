//! Inbound dispatch
//!
//! Runs on the receive task for every raw frame, in arrival order:
//! 1. answer heartbeats with an empty RESPONSE
//! 2. resolve or reject the pending request the frame answers
//! 3. invoke the `action:topic` subscription
//! 4. invoke the `all:topic` subscription
//! 5. emit the "message received" notification
//!
//! Nothing here may end the receive loop: decode failures and handler
//! panics are logged and emitted as error notifications.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::json;
use tracing::{debug, trace, warn};

use super::registry::Handler;
use super::session::Inner;
use super::SubscriptionAction;
use crate::protocol::{Action, HEARTBEAT_TOPIC, Message, codec};
use crate::utils::error::SessionError;

const PREVIEW_CHARS: usize = 100;

impl Inner {
    pub(crate) fn dispatch(&self, raw: &str) {
        let message = match codec::decode(raw, &self.version) {
            Ok(message) => message,
            Err(e) => {
                let err = SessionError::from(e);
                warn!(
                    "Dropping malformed frame: {err} | {}",
                    raw.chars().take(PREVIEW_CHARS).collect::<String>()
                );
                self.events.error.emit(&err);
                return;
            }
        };
        trace!("Received {}", message.header);

        if message.header.topic.eq_ignore_ascii_case(HEARTBEAT_TOPIC) {
            if let Err(e) = self.send_frame(&message.header.response(), &json!({})) {
                warn!("Failed to answer heartbeat: {e}");
                self.events.error.emit(&e);
            }
        }

        if let Some(request_id) = message.request_id() {
            if !self.pending.complete(&message) && message.header.action == Action::Response {
                debug!(
                    "No pending request {request_id} on {}; dropping late response",
                    message.header.topic
                );
            }
        }

        let action = message.header.action.as_key();
        for key in [action, SubscriptionAction::All.as_str()] {
            if let Some(handler) = self.subscriptions.handler(key, &message.header.topic) {
                self.invoke(&handler, key, &message);
            }
        }

        self.events.message.emit(&message);
    }

    fn invoke(&self, handler: &Handler, action: &str, message: &Message) {
        if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
            let err = SessionError::Handler(format!("{action}:{}", message.header.topic));
            warn!("{err}");
            self.events.error.emit(&err);
        }
    }
}
