//! The `client` module is the session engine.
//!
//! A [`Client`] keeps one live session with the broker: it multiplexes
//! publishes, correlated requests and topic subscriptions over a single
//! connection, and transparently reconnects, re-registers and re-subscribes
//! when the connection drops.

mod dispatch;
pub mod events;
mod pending;
mod reconnect;
mod registry;
mod session;

pub use events::{ListenerId, Listeners, ReconnectAttempt, SessionEvents};
pub use registry::{Handler, SubscriptionAction, SubscriptionInfo};
pub use session::{Client, PublishOptions, Registration, RequestOptions, SessionState};
