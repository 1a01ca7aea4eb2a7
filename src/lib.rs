//! # PopSub Client
//!
//! `popsub_client` is the client-side session engine for a topic-based
//! publish/subscribe and request/response broker. It speaks a compact
//! text protocol over WebSockets and keeps a session alive across
//! connection loss.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `client`: The session itself: connection state, request correlation, subscriptions, dispatch and reconnection.
//! - `config`: Loads client settings from files and environment variables.
//! - `protocol`: Frame headers, the wire codec and decoded messages.
//! - `topic`: Topic name grammar, hierarchy helpers and wildcard matching.
//! - `transport`: The connection boundary, with WebSocket and in-memory implementations.
//! - `utils`: Shared utilities, such as error handling and logging.

pub mod client;
pub mod config;
pub mod protocol;
pub mod topic;
pub mod transport;
pub mod utils;

pub use client::{
    Client, PublishOptions, ReconnectAttempt, Registration, RequestOptions, SessionEvents,
    SessionState, SubscriptionAction, SubscriptionInfo,
};
pub use config::ClientSettings;
pub use protocol::{Action, Header, Message};
pub use topic::Topic;
pub use utils::error::{Result, SessionError};
