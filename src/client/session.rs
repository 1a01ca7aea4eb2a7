//! Client session
//!
//! `Client` is a cheaply cloneable handle to one broker session. It owns:
//! - the connection state machine (`Disconnected`, `Connecting`,
//!   `Connected`, `Reconnecting`) and the current link
//! - the request correlation table and the subscription registry
//! - the registration to reissue after every reconnect
//! - the reconnection controller
//!
//! Concurrency notes:
//! - One receive task per connection decodes and dispatches frames in
//!   arrival order.
//! - Outbound frames go through the link's channel, drained by a single
//!   writer, so concurrent callers never interleave on the wire.
//! - `parking_lot` locks guard plain data and are never held across an
//!   `.await`. The async `connect_lock` serializes `establish` with the
//!   install step of `subscribe`.
//! - Background tasks hold a `Weak` reference; dropping every `Client`
//!   handle lets them wind down.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::events::SessionEvents;
use super::pending::{PendingRequests, saturating_millis};
use super::reconnect::ReconnectController;
use super::registry::{Handler, Subscription, SubscriptionAction, SubscriptionInfo, SubscriptionRegistry};
use crate::config::ClientSettings;
use crate::protocol::{
    Action, Header, Message, REGISTER_TOPIC, SUBSCRIBE_TOPIC, UNSUBSCRIBE_TOPIC, Version, codec,
};
use crate::topic;
use crate::transport::{Connector, OutboundFrame, TransportError, WebSocketConnector};
use crate::utils::error::{Result, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Options for [`Client::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the configured request timeout; also written to the header.
    pub timeout: Option<Duration>,
    pub parent_request_id: Option<String>,
}

/// Options for [`Client::publish`].
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Attach a request id and wait for the broker's RESPONSE.
    pub with_request_id: bool,
    pub parent_request_id: Option<String>,
    pub timeout: Option<Duration>,
}

/// Service identity announced on `system.service.register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub description: String,
}

struct ActiveLink {
    epoch: u64,
    outbound: UnboundedSender<OutboundFrame>,
    reader: JoinHandle<()>,
}

struct Connection {
    state: SessionState,
    link: Option<ActiveLink>,
}

pub(crate) struct Inner {
    pub(crate) settings: ClientSettings,
    pub(crate) version: Version,
    connector: Arc<dyn Connector>,
    conn: Mutex<Connection>,
    epoch: AtomicU64,
    connect_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    pub(crate) pending: Arc<PendingRequests>,
    pub(crate) subscriptions: SubscriptionRegistry,
    registration: Mutex<Option<Registration>>,
    pub(crate) events: SessionEvents,
    pub(crate) reconnect: ReconnectController,
}

#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.inner.settings.url)
            .field("state", &self.state())
            .field("pending", &self.inner.pending.len())
            .field("subscriptions", &self.inner.subscriptions.len())
            .finish()
    }
}

impl Client {
    /// Creates a session that connects over WebSocket.
    pub fn new(settings: ClientSettings) -> Result<Self> {
        Self::with_connector(settings, WebSocketConnector::new())
    }

    pub fn with_connector(settings: ClientSettings, connector: impl Connector) -> Result<Self> {
        if settings.url.is_empty() {
            return Err(SessionError::invalid_argument("server url is required"));
        }
        let version: Version = settings
            .protocol_version
            .parse()
            .map_err(|e| SessionError::invalid_argument(format!("{e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                version,
                connector: Arc::new(connector),
                conn: Mutex::new(Connection {
                    state: SessionState::Disconnected,
                    link: None,
                }),
                epoch: AtomicU64::new(0),
                connect_lock: tokio::sync::Mutex::new(()),
                closed: AtomicBool::new(false),
                pending: Arc::new(PendingRequests::default()),
                subscriptions: SubscriptionRegistry::default(),
                registration: Mutex::new(None),
                events: SessionEvents::default(),
                reconnect: ReconnectController::default(),
            }),
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.inner.subscriptions.snapshot()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect.attempts()
    }

    /// Opens the transport, replays registration and subscriptions, then
    /// enters `Connected`. No-op when already connected.
    ///
    /// On failure the error is emitted, disconnect handling runs (which may
    /// schedule a reconnect) and the error is returned.
    pub async fn connect(&self) -> Result<()> {
        self.inner.closed.store(false, Ordering::SeqCst);
        match self.inner.establish().await {
            Ok(()) => Ok(()),
            // Connection dropped during replay; disconnect handling already ran.
            Err(SessionError::NotConnected) => Err(SessionError::NotConnected),
            Err(e) => {
                error!("Failed to connect to {}: {e}", self.inner.settings.url);
                self.inner.events.error.emit(&e);
                self.inner.handle_disconnect();
                Err(e)
            }
        }
    }

    /// Closes the transport. No-op unless connected. Reconnects afterwards
    /// when reconnection is enabled; use [`Client::close`] to stop for good.
    pub async fn disconnect(&self) -> Result<()> {
        let link = {
            let mut conn = self.inner.conn.lock();
            if conn.state != SessionState::Connected {
                return Ok(());
            }
            conn.link.take()
        };
        info!("Disconnecting from {}", self.inner.settings.url);
        if let Some(link) = link {
            let _ = link.outbound.send(OutboundFrame::Close);
            link.reader.abort();
        }
        self.inner.handle_disconnect();
        Ok(())
    }

    /// Disconnects and disables automatic reconnection until the next
    /// explicit [`Client::connect`].
    pub async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.reconnect.cancel();
        if self.is_connected() {
            self.disconnect().await
        } else {
            self.inner.set_state(SessionState::Disconnected);
            Ok(())
        }
    }

    /// Announces this service to the broker. The registration is remembered
    /// and reissued after every reconnect.
    pub async fn register(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Message> {
        let registration = Registration {
            name: name.into(),
            description: description.into(),
        };
        *self.inner.registration.lock() = Some(registration.clone());
        self.inner.send_registration(&registration).await
    }

    /// Publishes `payload` on `topic`.
    ///
    /// Without `with_request_id` this is fire-and-forget and resolves to
    /// `None` once the frame is handed to the transport. With it, the call
    /// waits for the correlated RESPONSE like [`Client::request`].
    pub async fn publish<P: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &P,
        options: PublishOptions,
    ) -> Result<Option<Message>> {
        validate_topic(topic)?;
        let payload = serde_json::to_value(payload)?;

        if options.with_request_id {
            let timeout = options.timeout;
            return self
                .inner
                .correlated(
                    Action::Publish,
                    topic,
                    payload,
                    timeout,
                    options.parent_request_id,
                )
                .await
                .map(Some);
        }

        let header = Header::new(Action::Publish, topic, self.inner.version.to_string())
            .with_parent_request_id(options.parent_request_id)
            .with_timeout(options.timeout.map(saturating_millis));
        self.inner.send_frame(&header, &payload)?;
        Ok(None)
    }

    /// Sends a REQUEST and waits for the matching RESPONSE.
    ///
    /// Fails with `Remote` if the response carries an `error` field and with
    /// `RequestTimeout` if nothing arrives before the deadline.
    pub async fn request<P: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &P,
        options: RequestOptions,
    ) -> Result<Message> {
        validate_topic(topic)?;
        let payload = serde_json::to_value(payload)?;
        self.inner
            .correlated(
                Action::Request,
                topic,
                payload,
                options.timeout,
                options.parent_request_id,
            )
            .await
    }

    /// Answers `original` with a RESPONSE echoing its topic, version and
    /// request id.
    pub async fn respond<T, P: Serialize + ?Sized>(
        &self,
        original: &Message<T>,
        payload: &P,
    ) -> Result<()> {
        if original.header.request_id.is_none() {
            return Err(SessionError::invalid_argument(format!(
                "message on {} has no request id to respond to",
                original.header.topic
            )));
        }
        let payload = serde_json::to_value(payload)?;
        self.inner.send_frame(&original.header.response(), &payload)
    }

    /// Answers `original` with an error RESPONSE; the requester's future
    /// fails with `message`.
    pub async fn respond_error<T>(&self, original: &Message<T>, message: &str) -> Result<()> {
        self.respond(original, &json!({ "error": { "message": message } }))
            .await
    }

    /// Subscribes `callback` to `action` frames on `topic`.
    ///
    /// The payload of every routed frame is decoded into `T`; frames that do
    /// not decode are reported on the error notification and skipped.
    /// Re-subscribing with the same priority is a no-op. Until the session is
    /// `Connected` (including while a connect is replaying) the entry is only
    /// stored and gets announced by the next post-connect replay.
    pub async fn subscribe<T, F>(
        &self,
        action: SubscriptionAction,
        topic: &str,
        priority: i32,
        callback: F,
    ) -> Result<()>
    where
        T: DeserializeOwned + 'static,
        F: Fn(Message<T>) + Send + Sync + 'static,
    {
        validate_topic(topic)?;

        let session = Arc::downgrade(&self.inner);
        let handler: Handler = Arc::new(move |message: &Message| match message.decode::<T>() {
            Ok(typed) => callback(typed),
            Err(e) => {
                warn!("Dropping {} frame on {}: {e}", message.header.action, message.header.topic);
                if let Some(inner) = session.upgrade() {
                    inner.events.error.emit(&SessionError::PayloadDecode(format!(
                        "{} payload does not match subscriber type: {e}",
                        message.header.topic
                    )));
                }
            }
        });

        let info = SubscriptionInfo {
            action,
            topic: topic.to_string(),
            priority,
        };
        {
            // Held against `establish`: an entry is announced either by the
            // post-connect replay or below, never both.
            let _guard = self.inner.connect_lock.lock().await;
            if !self.inner.subscriptions.install(Subscription {
                info: info.clone(),
                handler,
            }) {
                debug!("Already subscribed to {action}:{topic} with priority {priority}");
                return Ok(());
            }
            if self.inner.state() != SessionState::Connected {
                debug!("Not connected; {action}:{topic} will be announced on connect");
                return Ok(());
            }
        }
        self.inner.announce(&info).await
    }

    /// Removes the `action:topic` subscription and tells the broker. No-op
    /// if there is none.
    pub async fn unsubscribe(&self, topic: &str, action: SubscriptionAction) -> Result<()> {
        let Some(removed) = self.inner.subscriptions.remove(action, topic) else {
            return Ok(());
        };
        if !self.inner.has_link() {
            return Ok(());
        }
        let payload = json!({
            "action": removed.info.action,
            "topic": removed.info.topic,
        });
        self.inner
            .correlated(Action::Request, UNSUBSCRIBE_TOPIC, payload, None, None)
            .await
            .map(|_| ())
    }

    /// Forgets every local subscription without telling the broker.
    pub fn clear_subscriptions(&self) {
        self.inner.subscriptions.clear();
    }
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic::is_valid(topic) {
        Ok(())
    } else {
        Err(SessionError::invalid_topic(topic))
    }
}

impl Inner {
    pub(crate) fn state(&self) -> SessionState {
        self.conn.lock().state
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        let mut conn = self.conn.lock();
        if conn.state != state {
            debug!("Session state {} -> {state}", conn.state);
            conn.state = state;
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn has_link(&self) -> bool {
        self.conn.lock().link.is_some()
    }

    pub(crate) fn send_frame(&self, header: &Header, payload: &Value) -> Result<()> {
        let text = codec::encode(header, payload)?;
        let conn = self.conn.lock();
        let Some(link) = conn.link.as_ref() else {
            return Err(SessionError::NotConnected);
        };
        link.outbound
            .send(OutboundFrame::Text(text))
            .map_err(|_| TransportError::Send("connection closed".into()))?;
        trace!("Sent {header}");
        Ok(())
    }

    /// Sends a frame carrying a fresh request id and waits for its answer.
    async fn correlated(
        &self,
        action: Action,
        topic: &str,
        payload: Value,
        timeout: Option<Duration>,
        parent_request_id: Option<String>,
    ) -> Result<Message> {
        let request_id = Uuid::new_v4().to_string();
        let header = Header::new(action, topic, self.version.to_string())
            .with_request_id(request_id.clone())
            .with_parent_request_id(parent_request_id)
            .with_timeout(timeout.map(saturating_millis));

        let wait = timeout.unwrap_or_else(|| self.settings.request_timeout());
        let pending = self.pending.register(request_id, topic, wait);
        // On failure the handle is dropped and the entry with it.
        self.send_frame(&header, &payload)?;
        debug!("Awaiting response to {} on {topic}", pending.request_id());
        pending.wait().await
    }

    async fn announce(&self, info: &SubscriptionInfo) -> Result<()> {
        let payload = json!({
            "action": info.action,
            "topic": info.topic,
            "priority": info.priority,
        });
        self.correlated(Action::Request, SUBSCRIBE_TOPIC, payload, None, None)
            .await
            .map(|_| ())
    }

    async fn send_registration(&self, registration: &Registration) -> Result<Message> {
        let payload = serde_json::to_value(registration)?;
        self.correlated(Action::Request, REGISTER_TOPIC, payload, None, None)
            .await
    }

    /// Opens a link and runs the post-connect sequence.
    ///
    /// Returns `NotConnected` if the link was lost before the sequence
    /// finished; disconnect handling has run in that case.
    pub(crate) async fn establish(self: &Arc<Self>) -> Result<()> {
        let _guard = self.connect_lock.lock().await;
        if self.state() == SessionState::Connected {
            return Ok(());
        }

        self.set_state(SessionState::Connecting);
        info!("Connecting to {}", self.settings.url);
        let link = self.connector.open(&self.settings.url).await?;

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            // The reader must not observe a closed link before it is installed.
            let mut conn = self.conn.lock();
            let reader = tokio::spawn(receive_loop(Arc::downgrade(self), epoch, link.inbound));
            conn.link = Some(ActiveLink {
                epoch,
                outbound: link.outbound,
                reader,
            });
        }

        self.replay().await;

        {
            let mut conn = self.conn.lock();
            if conn.link.as_ref().map(|l| l.epoch) != Some(epoch) {
                warn!("Connection to {} lost during replay", self.settings.url);
                return Err(SessionError::NotConnected);
            }
            conn.state = SessionState::Connected;
        }
        self.reconnect.reset();
        info!("Connected to {}", self.settings.url);
        self.events.connected.emit(&());
        Ok(())
    }

    /// Reissues the registration, then every subscription concurrently.
    /// Failures are reported but do not abort the connect.
    async fn replay(&self) {
        let registration = self.registration.lock().clone();
        if let Some(registration) = registration {
            if let Err(e) = self.send_registration(&registration).await {
                warn!("Failed to re-register {}: {e}", registration.name);
                self.events.error.emit(&e);
            }
        }

        let subscriptions = self.subscriptions.snapshot();
        if subscriptions.is_empty() {
            return;
        }
        debug!("Replaying {} subscriptions", subscriptions.len());
        let results = join_all(subscriptions.iter().map(|info| self.announce(info))).await;
        for (info, result) in subscriptions.iter().zip(results) {
            if let Err(e) = result {
                warn!("Failed to replay {}:{}: {e}", info.action, info.topic);
                self.events.error.emit(&e);
            }
        }
    }

    /// Called by the receive task when its link ends. Ignored if the link
    /// was already replaced or taken down by `disconnect`.
    fn connection_lost(self: &Arc<Self>, epoch: u64) {
        {
            let mut conn = self.conn.lock();
            match conn.link.as_ref() {
                Some(link) if link.epoch == epoch => conn.link = None,
                _ => return,
            }
        }
        warn!("Connection to {} lost", self.settings.url);
        self.handle_disconnect();
    }

    pub(crate) fn handle_disconnect(self: &Arc<Self>) {
        self.reconnect.cancel();
        self.set_state(SessionState::Disconnected);
        self.events.disconnected.emit(&());

        if self.settings.cancel_pending_on_disconnect {
            let failed = self.pending.fail_all(|| SessionError::NotConnected);
            if failed > 0 {
                debug!("Failed {failed} pending requests on disconnect");
            }
        }

        if self.settings.reconnect.enabled && !self.is_closed() {
            self.reconnect.start(Arc::downgrade(self));
        }
    }
}

async fn receive_loop(
    session: Weak<Inner>,
    epoch: u64,
    mut inbound: UnboundedReceiver<std::result::Result<String, TransportError>>,
) {
    while let Some(frame) = inbound.recv().await {
        let Some(inner) = session.upgrade() else {
            return;
        };
        match frame {
            Ok(text) => inner.dispatch(&text),
            Err(e) => {
                let err = SessionError::from(e);
                warn!("Receive failed: {err}");
                inner.events.error.emit(&err);
                break;
            }
        }
    }

    if let Some(inner) = session.upgrade() {
        inner.connection_lost(epoch);
    }
}
