//! Connection manager: one notification socket per subscriber.
//!
//! Lifecycle: `Idle → Connecting → Open → Closed`. `Closed` is reachable
//! from every state and a new `open` may start after it. There is no
//! automatic reconnect: a lost socket leaves the subscriber on REST data
//! until it is remounted.
//!
//! The manager never interprets frames. `recv` hands them out verbatim, in
//! transport order, for the decoder.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use tracing::{debug, info, trace, warn};

use crate::config::Origin;
use crate::error::ChannelError;
use crate::token::SessionToken;
use crate::transport::{Connector, TransportEvent, TransportStream};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

pub struct ConnectionManager<C> {
    connector: C,
    origin: Origin,
    state: ConnectionState,
    last_error: Option<String>,
    stream: Option<TransportStream>,
    connection_id: u64,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, origin: Origin) -> Self {
        Self {
            connector,
            origin,
            state: ConnectionState::Idle,
            last_error: None,
            stream: None,
            connection_id: 0,
        }
    }

    /// Start connecting with `token` as the query credential.
    ///
    /// Without a usable token nothing is attempted and the state is left
    /// unchanged. A live connection is closed before the new one starts.
    pub fn open(&mut self, token: Option<&SessionToken>) -> Result<(), ChannelError> {
        let Some(token) = token else {
            info!(
                component = "connection",
                event = "ws.open.no_token",
                "No session token, staying on REST data"
            );
            return Err(ChannelError::MissingToken);
        };
        if token.is_expired() {
            info!(
                component = "connection",
                event = "ws.open.token_expired",
                "Session token expired, staying on REST data"
            );
            return Err(ChannelError::ExpiredToken);
        }
        let url = self.origin.socket_url(token)?;

        if self.is_live() {
            self.close();
        }

        self.connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            component = "connection",
            event = "ws.connecting",
            connection_id = self.connection_id,
            host = url.host_str().unwrap_or_default(),
            secure = self.origin.is_secure(),
            "Opening notification socket"
        );
        self.stream = Some(self.connector.connect(url));
        self.state = ConnectionState::Connecting;
        self.last_error = None;
        Ok(())
    }

    /// Next raw frame. `None` once the connection is closed (or was never
    /// opened); no frame is handed out after `close`.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            let stream = self.stream.as_mut()?;
            let event = stream.next().await;
            if let Some(frame) = self.on_transport_event(event) {
                return Some(frame);
            }
        }
    }

    /// Apply one transport event; returns the frame to decode, if any.
    fn on_transport_event(&mut self, event: Option<TransportEvent>) -> Option<String> {
        match event {
            Some(TransportEvent::Opened) => {
                self.on_open();
                None
            }
            Some(TransportEvent::Frame(raw)) => self.on_message(raw),
            Some(TransportEvent::Closed { reason }) => {
                self.on_close(reason);
                None
            }
            Some(TransportEvent::Failed(error)) => {
                self.on_error(error);
                None
            }
            None => {
                self.on_close(None);
                None
            }
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(
                component = "connection",
                event = "ws.open.unexpected",
                connection_id = self.connection_id,
                state = ?self.state,
            );
            return;
        }
        self.state = ConnectionState::Open;
        info!(
            component = "connection",
            event = "ws.connection.opened",
            connection_id = self.connection_id,
            "Notification socket open"
        );
    }

    fn on_message(&mut self, raw: String) -> Option<String> {
        if !self.is_live() {
            return None;
        }
        trace!(
            component = "connection",
            event = "ws.frame.received",
            connection_id = self.connection_id,
            payload_bytes = raw.len(),
        );
        Some(raw)
    }

    fn on_close(&mut self, reason: Option<String>) {
        self.stream = None;
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        info!(
            component = "connection",
            event = "ws.connection.closed",
            connection_id = self.connection_id,
            reason = reason.as_deref().unwrap_or("none"),
            "Notification socket closed"
        );
        if reason.is_some() {
            self.last_error = reason;
        }
    }

    fn on_error(&mut self, error: String) {
        self.stream = None;
        warn!(
            component = "connection",
            event = "ws.connection.error",
            connection_id = self.connection_id,
            error = %error,
            "Notification socket error"
        );
        self.state = ConnectionState::Closed;
        self.last_error = Some(error);
    }
}

impl<C> ConnectionManager<C> {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Connecting or open
    pub fn is_live(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        )
    }

    /// Tear down from any state. Idempotent; cancels a pending handshake.
    pub fn close(&mut self) {
        self.stream = None;
        if self.state == ConnectionState::Closed {
            return;
        }
        debug!(
            component = "connection",
            event = "ws.close.requested",
            connection_id = self.connection_id,
            from = ?self.state,
        );
        self.state = ConnectionState::Closed;
    }
}
