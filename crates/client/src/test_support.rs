//! Scripted transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::channel::mpsc;
use futures::stream::StreamExt;
use url::Url;

use crate::transport::{Connector, TransportEvent, TransportStream};

/// Test-side handle that pushes events into one scripted connection
pub struct ScriptedSocket {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ScriptedSocket {
    pub fn push(&self, event: TransportEvent) {
        let _ = self.tx.unbounded_send(event);
    }

    pub fn frame(&self, raw: &str) {
        self.push(TransportEvent::Frame(raw.to_string()));
    }

    /// True once the manager dropped its end of the stream
    pub fn is_dropped(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Hands out one scripted stream per `connect` call and records the URLs.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    inner: Rc<RefCell<Scripted>>,
}

#[derive(Default)]
struct Scripted {
    pending: VecDeque<TransportStream>,
    urls: Vec<Url>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connection and return the handle that drives it
    pub fn socket(&self) -> ScriptedSocket {
        let (tx, rx) = mpsc::unbounded();
        self.inner.borrow_mut().pending.push_back(rx.boxed());
        ScriptedSocket { tx }
    }

    pub fn connect_calls(&self) -> usize {
        self.inner.borrow().urls.len()
    }

    pub fn urls(&self) -> Vec<Url> {
        self.inner.borrow().urls.clone()
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, url: Url) -> TransportStream {
        let mut inner = self.inner.borrow_mut();
        inner.urls.push(url);
        inner
            .pending
            .pop_front()
            .unwrap_or_else(|| futures::stream::pending().boxed())
    }
}
