//! WebSocket transport seam.
//!
//! A `Connector` turns a socket URL into a lazy stream of transport events.
//! Polling the stream drives the handshake; dropping it cancels the
//! handshake or closes the socket. Tests substitute a scripted connector.

use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

/// What the transport reports, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed
    Opened,
    /// One text frame, verbatim
    Frame(String),
    /// Remote close, with the close reason when one was sent
    Closed { reason: Option<String> },
    /// Handshake or socket failure
    Failed(String),
}

pub type TransportStream = BoxStream<'static, TransportEvent>;

pub trait Connector {
    fn connect(&self, url: Url) -> TransportStream;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production connector backed by `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(&self, url: Url) -> TransportStream {
        let target = url.to_string();
        stream::once(async move { connect_async(target).await })
            .flat_map(|result| match result {
                Ok((socket, _response)) => stream::once(future::ready(TransportEvent::Opened))
                    .chain(socket_events(socket))
                    .boxed(),
                Err(e) => stream::once(future::ready(TransportEvent::Failed(e.to_string()))).boxed(),
            })
            .boxed()
    }
}

fn socket_events(socket: WsStream) -> impl Stream<Item = TransportEvent> + Send + 'static {
    socket.filter_map(|result| {
        future::ready(match result {
            Ok(Message::Text(text)) => Some(TransportEvent::Frame(text.as_str().to_owned())),
            Ok(Message::Close(frame)) => Some(TransportEvent::Closed {
                reason: frame.map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str())),
            }),
            Ok(Message::Binary(data)) => {
                debug!(
                    component = "transport",
                    event = "ws.frame.binary_ignored",
                    payload_bytes = data.len(),
                    "Ignoring binary frame"
                );
                None
            }
            // Ping/pong are answered by tungstenite itself
            Ok(_) => None,
            Err(e) => Some(TransportEvent::Failed(e.to_string())),
        })
    })
}
