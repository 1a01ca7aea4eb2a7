//! Subscription registry
//!
//! Keyed by `action:topic`. The registry serves two purposes: routing inbound
//! frames to callbacks, and remembering what to re-announce to the broker
//! after a fresh connection.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::protocol::{Action, Message};
use crate::utils::error::SessionError;

/// Callback invoked with every frame routed to a subscription.
pub type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Which inbound actions a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Publish,
    Request,
    Response,
    /// Any action on the topic.
    All,
}

impl SubscriptionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionAction::Publish => "publish",
            SubscriptionAction::Request => "request",
            SubscriptionAction::Response => "response",
            SubscriptionAction::All => "all",
        }
    }
}

impl From<Action> for SubscriptionAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Publish => SubscriptionAction::Publish,
            Action::Request => SubscriptionAction::Request,
            Action::Response => SubscriptionAction::Response,
        }
    }
}

impl FromStr for SubscriptionAction {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "publish" => Ok(SubscriptionAction::Publish),
            "request" => Ok(SubscriptionAction::Request),
            "response" => Ok(SubscriptionAction::Response),
            "all" => Ok(SubscriptionAction::All),
            other => Err(SessionError::invalid_argument(format!(
                "unknown subscription action {other:?}"
            ))),
        }
    }
}

impl fmt::Display for SubscriptionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub action: SubscriptionAction,
    pub topic: String,
    pub priority: i32,
}

#[derive(Clone)]
pub(crate) struct Subscription {
    pub(crate) info: SubscriptionInfo,
    pub(crate) handler: Handler,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

pub(crate) fn routing_key(action: &str, topic: &str) -> String {
    format!("{action}:{topic}")
}

#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    entries: Mutex<HashMap<String, Subscription>>,
}

impl SubscriptionRegistry {
    /// Inserts or replaces the entry for the subscription's key.
    ///
    /// Returns false, leaving the registry untouched, when an entry with the
    /// same key and priority already exists.
    pub(crate) fn install(&self, subscription: Subscription) -> bool {
        let key = routing_key(subscription.info.action.as_str(), &subscription.info.topic);
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            if existing.info.priority == subscription.info.priority {
                return false;
            }
        }
        entries.insert(key, subscription);
        true
    }

    pub(crate) fn remove(&self, action: SubscriptionAction, topic: &str) -> Option<Subscription> {
        self.entries
            .lock()
            .remove(&routing_key(action.as_str(), topic))
    }

    pub(crate) fn handler(&self, action: &str, topic: &str) -> Option<Handler> {
        self.entries
            .lock()
            .get(&routing_key(action, topic))
            .map(|s| s.handler.clone())
    }

    pub(crate) fn snapshot(&self) -> Vec<SubscriptionInfo> {
        self.entries.lock().values().map(|s| s.info.clone()).collect()
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
