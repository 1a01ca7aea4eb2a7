//! In-process transport
//!
//! `MemoryConnector` hands every successful `open` to a [`MemoryPeer`] that
//! plays the broker side of the link. Used by the engine tests and handy
//! for applications that want to exercise their handlers without a network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{Connector, Link, OutboundFrame, TransportError};

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    refuse: Arc<AtomicBool>,
    attempts: Arc<AtomicU32>,
    accepted: UnboundedSender<MemoryPeer>,
}

/// Broker side of an in-memory link.
#[derive(Debug)]
pub struct MemoryPeer {
    pub url: String,
    from_client: UnboundedReceiver<OutboundFrame>,
    to_client: UnboundedSender<Result<String, TransportError>>,
}

impl MemoryConnector {
    /// Returns the connector and the stream of peers it accepts.
    pub fn new() -> (Self, UnboundedReceiver<MemoryPeer>) {
        let (accepted, peers) = mpsc::unbounded_channel();
        let connector = Self {
            refuse: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicU32::new(0)),
            accepted,
        };
        (connector, peers)
    }

    /// While set, every `open` fails with a connect error.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Number of `open` calls so far, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Link, TransportError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = if self.refuse.load(Ordering::SeqCst) {
            Err(TransportError::Connect(format!("{url} refused connection")))
        } else {
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            let peer = MemoryPeer {
                url: url.to_string(),
                from_client: out_rx,
                to_client: in_tx,
            };
            self.accepted
                .send(peer)
                .map(|_| Link {
                    outbound: out_tx,
                    inbound: in_rx,
                })
                .map_err(|_| TransportError::Connect(format!("{url} has no listener")))
        };
        async move { result }.boxed()
    }
}

impl MemoryPeer {
    /// Next text frame from the client; `None` once the client closed or
    /// dropped the link.
    pub async fn recv_text(&mut self) -> Option<String> {
        match self.from_client.recv().await? {
            OutboundFrame::Text(text) => Some(text),
            OutboundFrame::Close => None,
        }
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.to_client
            .send(Ok(text.into()))
            .map_err(|_| TransportError::Send("client side dropped".into()))
    }

    /// Delivers a read error to the client, which ends its receive loop.
    pub fn fail(&self, error: TransportError) {
        let _ = self.to_client.send(Err(error));
    }
}
