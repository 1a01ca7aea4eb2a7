//! The `transport` module is the boundary between the session engine and the
//! network.
//!
//! The engine only needs to send text frames, receive text frames and notice
//! closure. A [`Connector`] opens a [`Link`]: an outbound channel drained by
//! a single writer task (so concurrent senders never interleave partial
//! frames) and an inbound channel that ends when the connection closes.

pub mod memory;
pub mod websocket;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub use memory::{MemoryConnector, MemoryPeer};
pub use websocket::WebSocketConnector;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("read failed: {0}")]
    Read(String),
}

/// Frames handed to a link's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the connection cleanly; the writer stops after this.
    Close,
}

/// An open connection.
///
/// The inbound channel yields `Ok(text)` per frame, `Err` on an
/// unrecoverable read error, and ends (`None`) once the peer closes.
#[derive(Debug)]
pub struct Link {
    pub outbound: UnboundedSender<OutboundFrame>,
    pub inbound: UnboundedReceiver<Result<String, TransportError>>,
}

pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Link, TransportError>>;
}
