//! Client configuration.

use std::time::Duration;

use url::Url;
use wirechat_protocol::PROTOCOL_VERSION;
use wirechat_session::{BackoffConfig, OutboundBuffer};

use crate::WirechatError;

/// Settings for a [`Client`](crate::Client).
///
/// Build one with [`ClientConfig::new`] and the `with_*` methods:
///
/// ```rust
/// use std::time::Duration;
/// use wirechat::ClientConfig;
///
/// let config = ClientConfig::new("wss://chat.example.com/ws")
///     .with_token("jwt")
///     .with_auto_reconnect(true)
///     .with_buffering(true, 50)
///     .with_read_timeout(Some(Duration::from_secs(90)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, `ws://` or `wss://`.
    pub url: String,

    /// Protocol version sent in the hello. Default: 1.
    pub protocol: u32,

    /// Bearer credential sent in the hello.
    pub token: Option<String>,

    /// Display name for guest sessions.
    pub user: Option<String>,

    /// Deadline for dialing the socket. Default: 10 seconds.
    pub handshake_timeout: Option<Duration>,

    /// Deadline for each inbound frame. Default: none. A chat room can be
    /// quiet for a long time, so only set this if the server pings.
    pub read_timeout: Option<Duration>,

    /// Deadline for each outbound frame. Default: 10 seconds.
    pub write_timeout: Option<Duration>,

    /// Reconnect after an unexpected disconnect. Default: off.
    pub auto_reconnect: bool,

    /// Delays and attempt limit for reconnection.
    pub backoff: BackoffConfig,

    /// Keep envelopes written while offline and send them after the next
    /// connect. Default: off.
    pub enable_buffering: bool,

    /// Capacity of the offline buffer. Default: 100.
    pub max_buffer_size: usize,

    /// Capacity of the queue between callers and the write task.
    /// Default: 16.
    pub write_queue_size: usize,

    /// Capacity of the [`Client::events`](crate::Client::events) channel.
    /// Default: 256.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            protocol: PROTOCOL_VERSION,
            token: None,
            user: None,
            handshake_timeout: Some(Duration::from_secs(10)),
            read_timeout: None,
            write_timeout: Some(Duration::from_secs(10)),
            auto_reconnect: false,
            backoff: BackoffConfig::default(),
            enable_buffering: false,
            max_buffer_size: OutboundBuffer::<()>::DEFAULT_CAPACITY,
            write_queue_size: 16,
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Default settings for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_protocol(mut self, protocol: u32) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Turns offline buffering on or off and sets its capacity.
    pub fn with_buffering(mut self, enabled: bool, max_size: usize) -> Self {
        self.enable_buffering = enabled;
        self.max_buffer_size = max_size;
        self
    }

    pub fn with_write_queue_size(mut self, size: usize) -> Self {
        self.write_queue_size = size;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Checks the endpoint and queue sizes.
    ///
    /// # Errors
    /// An [`InvalidConfig`](crate::ErrorKind::InvalidConfig) error if the URL
    /// is empty, unparsable or not `ws`/`wss`, or if the write queue has
    /// zero capacity.
    pub fn validate(&self) -> Result<(), WirechatError> {
        if self.url.trim().is_empty() {
            return Err(WirechatError::invalid_config("url is required"));
        }
        let parsed = Url::parse(&self.url).map_err(|e| {
            WirechatError::wrap(
                crate::ErrorKind::InvalidConfig,
                format!("invalid url {:?}", self.url),
                e,
            )
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(WirechatError::invalid_config(format!(
                "unsupported url scheme {:?}, expected ws or wss",
                parsed.scheme()
            )));
        }
        if self.write_queue_size == 0 {
            return Err(WirechatError::invalid_config(
                "write_queue_size must be at least 1",
            ));
        }
        Ok(())
    }
}
