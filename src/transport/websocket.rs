//! WebSocket transport
//!
//! Opens a client WebSocket with `tokio-tungstenite` and bridges it to the
//! channel pair of a [`Link`]:
//! - a send loop forwards outbound frames to the socket until the channel is
//!   dropped, a `Close` frame is requested, or the socket write fails
//! - a receive loop forwards text frames inbound until the peer closes or a
//!   read error occurs
//!
//! Binary frames are ignored; ping/pong is handled by tungstenite.

use futures::FutureExt;
use futures::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use super::{Connector, Link, OutboundFrame, TransportError};

#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Link, TransportError>> {
        let url = url.to_string();
        async move { open_websocket(&url).await }.boxed()
    }
}

async fn open_websocket(url: &str) -> Result<Link, TransportError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    debug!("WebSocket connected to {url}");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Result<String, TransportError>>();

    spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let result = match frame {
                OutboundFrame::Text(text) => ws_sender.send(WsMessage::text(text)).await,
                OutboundFrame::Close => {
                    let _ = ws_sender.send(WsMessage::Close(None)).await;
                    break;
                }
            };
            if let Err(e) = result {
                warn!("Failed to send frame: {e}");
                break;
            }
        }
        let _ = ws_sender.close().await;
        debug!("Send loop closed");
    });

    spawn(async move {
        while let Some(next) = ws_receiver.next().await {
            match next {
                Ok(WsMessage::Text(text)) => {
                    if in_tx.send(Ok(text.as_str().to_owned())).is_err() {
                        break;
                    }
                }
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    let _ = in_tx.send(Err(TransportError::Read(e.to_string())));
                    break;
                }
            }
        }
        debug!("Receive loop closed");
    });

    Ok(Link {
        outbound: out_tx,
        inbound: in_rx,
    })
}
