//! Chatbot reply streaming.
//!
//! The backend answers `POST /api/chatbot/sessions/<id>/chat/` with a
//! `text/event-stream` body of `data: {"chunk": ...}` lines ending in
//! `data: {"done": true}`. A reply is exposed as a finite `Stream` of text
//! chunks. Dropping it cancels the request; calling `send` again starts over.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::header::ACCEPT;
use taskwire_protocol::{ChatRequest, ChatStreamFrame, EntityId};
use tracing::{debug, info, warn};

use crate::error::RestError;
use crate::rest::HttpCollaborator;

/// Reply chunks in arrival order; ends after the `done` marker.
pub type ChatStream = BoxStream<'static, Result<String, RestError>>;

pub fn chat_path(session_id: EntityId) -> String {
    format!("/api/chatbot/sessions/{session_id}/chat/")
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: HttpCollaborator,
}

impl ChatClient {
    pub fn new(http: HttpCollaborator) -> Self {
        Self { http }
    }

    /// Post `message` to the session and stream the reply.
    pub async fn send(&self, session_id: EntityId, message: &str) -> Result<ChatStream, RestError> {
        let path = chat_path(session_id);
        let response = self
            .http
            .post(&path)?
            .header(ACCEPT, "text/event-stream")
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                component = "chat",
                event = "chat.request.failed",
                session_id,
                status = status.as_u16(),
                "Chat request failed"
            );
            return Err(RestError::Status {
                endpoint: path,
                status: status.as_u16(),
            });
        }

        info!(
            component = "chat",
            event = "chat.stream.started",
            session_id,
        );
        Ok(reply_stream(response.bytes_stream()))
    }
}

/// Incremental `data:` line parser. Bytes may be split anywhere, including
/// inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes; returns every complete frame. Nothing is
    /// returned once the `done` frame has been seen.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<ChatStreamFrame> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if self.take_line(&line, &mut frames) {
                self.buffer.clear();
                break;
            }
        }
        frames
    }

    /// The body ended: parse a trailing line that had no newline.
    pub fn finish(&mut self) -> Vec<ChatStreamFrame> {
        let mut frames = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.take_line(&line, &mut frames);
        }
        self.done = true;
        frames
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns true when `line` carried the `done` marker.
    fn take_line(&mut self, line: &[u8], frames: &mut Vec<ChatStreamFrame>) -> bool {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(data) = line.strip_prefix("data:") else {
            return false;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        match serde_json::from_str::<ChatStreamFrame>(data) {
            Ok(ChatStreamFrame::Done { done: true }) => {
                self.done = true;
                frames.push(ChatStreamFrame::Done { done: true });
                true
            }
            Ok(ChatStreamFrame::Done { done: false }) => false,
            Ok(frame) => {
                frames.push(frame);
                false
            }
            Err(e) => {
                warn!(
                    component = "chat",
                    event = "chat.frame.decode_failed",
                    error = %e,
                    "Skipping unparseable event line"
                );
                false
            }
        }
    }
}

struct Pump {
    body: BoxStream<'static, Result<Bytes, RestError>>,
    decoder: SseDecoder,
    ready: VecDeque<String>,
}

impl Pump {
    fn queue(&mut self, frames: Vec<ChatStreamFrame>) {
        self.ready.extend(frames.into_iter().filter_map(|frame| match frame {
            ChatStreamFrame::Chunk { chunk } => Some(chunk),
            ChatStreamFrame::Done { .. } => None,
        }));
    }
}

/// Turn an event-stream body into reply chunks. The body is not polled
/// after the `done` marker.
pub fn reply_stream<S, E>(body: S) -> ChatStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
    RestError: From<E>,
{
    let pump = Pump {
        body: body.map(|chunk| chunk.map_err(RestError::from)).boxed(),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
    };

    stream::unfold(Some(pump), |state| async move {
        let mut pump = state?;
        loop {
            if let Some(chunk) = pump.ready.pop_front() {
                return Some((Ok(chunk), Some(pump)));
            }
            if pump.decoder.is_done() {
                debug!(component = "chat", event = "chat.stream.done");
                return None;
            }
            match pump.body.next().await {
                Some(Ok(bytes)) => {
                    let frames = pump.decoder.push(&bytes);
                    pump.queue(frames);
                }
                Some(Err(e)) => return Some((Err(e), None)),
                None => {
                    warn!(
                        component = "chat",
                        event = "chat.stream.truncated",
                        "Chat stream ended without a done marker"
                    );
                    let frames = pump.decoder.finish();
                    pump.queue(frames);
                }
            }
        }
    })
    .boxed()
}
