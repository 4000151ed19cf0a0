//! Chatbot streaming types

use serde::{Deserialize, Serialize};

/// Body of `POST /api/chatbot/sessions/<id>/chat/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// One `data:` line of the chat event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatStreamFrame {
    Chunk { chunk: String },
    Done { done: bool },
}
