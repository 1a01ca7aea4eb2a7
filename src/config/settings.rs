use std::time::Duration;

use serde::Deserialize;

use crate::protocol::PROTOCOL_VERSION;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Top-level configuration for a client session.
///
/// Covers the broker endpoint, request and protocol defaults, and the
/// reconnection policy.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientSettings {
    /// Broker endpoint, e.g. `ws://127.0.0.1:8080`.
    pub url: String,
    pub request_timeout_ms: u64,
    /// Protocol version written to outbound headers and used as the lower
    /// bound when accepting inbound ones.
    pub protocol_version: String,
    /// Fail in-flight requests as soon as the connection drops instead of
    /// letting them run into their own timeout.
    pub cancel_pending_on_disconnect: bool,
    pub reconnect: ReconnectSettings,
}

/// Reconnection policy.
///
/// Controls automatic recovery after the connection is lost: whether to
/// retry, how long to wait between attempts and when to give up.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReconnectSettings {
    pub enabled: bool,
    /// Fixed delay before each attempt.
    pub delay_ms: u64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

/// Partial configuration loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled from
/// `ClientSettings::default()` by [`ClientSettings::merge`].
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub protocol_version: Option<String>,
    pub cancel_pending_on_disconnect: Option<bool>,
    pub reconnect: Option<PartialReconnectSettings>,
}

/// Partial reconnection settings.
///
/// Read from the `reconnect` table (or `POPSUB__RECONNECT__*` variables) with
/// every field optional.
#[derive(Debug, Deserialize, Default)]
pub struct PartialReconnectSettings {
    pub enabled: Option<bool>,
    pub delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Defaults used when no file or environment value is present.
///
/// Connects to a local broker, waits 10 s for responses and reconnects
/// forever with a 1 s delay.
impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            protocol_version: PROTOCOL_VERSION.to_string(),
            cancel_pending_on_disconnect: false,
            reconnect: ReconnectSettings::default(),
        }
    }
}

/// Reconnection enabled, 1 s between attempts, no attempt cap.
impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_attempts: None,
        }
    }
}

impl ClientSettings {
    /// Default settings pointed at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Timeout for requests that do not set their own. Saturates at
    /// `u64::MAX` milliseconds.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Protocol version written to outbound headers. Parsed when the
    /// `Client` is built.
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Enables or disables automatic reconnection.
    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.reconnect.enabled = enabled;
        self
    }

    /// Fixed delay before each reconnect attempt.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Attempt cap; `None` retries forever.
    pub fn with_max_reconnect_attempts(mut self, max: Option<u32>) -> Self {
        self.reconnect.max_attempts = max;
        self
    }

    /// Fail in-flight requests with `NotConnected` when the link drops.
    pub fn with_cancel_pending_on_disconnect(mut self, cancel: bool) -> Self {
        self.cancel_pending_on_disconnect = cancel;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect.delay_ms)
    }

    /// Fills every unset field of `partial` from `self`.
    pub fn merge(self, partial: PartialSettings) -> Self {
        let reconnect = partial.reconnect.unwrap_or_default();
        Self {
            url: partial.url.unwrap_or(self.url),
            request_timeout_ms: partial
                .request_timeout_ms
                .unwrap_or(self.request_timeout_ms),
            protocol_version: partial.protocol_version.unwrap_or(self.protocol_version),
            cancel_pending_on_disconnect: partial
                .cancel_pending_on_disconnect
                .unwrap_or(self.cancel_pending_on_disconnect),
            reconnect: ReconnectSettings {
                enabled: reconnect.enabled.unwrap_or(self.reconnect.enabled),
                delay_ms: reconnect.delay_ms.unwrap_or(self.reconnect.delay_ms),
                max_attempts: reconnect.max_attempts.or(self.reconnect.max_attempts),
            },
        }
    }
}
