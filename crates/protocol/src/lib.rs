//! Taskwire Protocol
//!
//! Types exchanged with the task-manager backend: frames pushed over the
//! `/ws/tasks/` WebSocket, entity records returned by the REST API, and the
//! chatbot's event-stream chunks. All of them travel as JSON.

pub mod chat;
pub mod server;
pub mod types;

pub use chat::{ChatRequest, ChatStreamFrame};
pub use server::{NotificationEvent, ServerMessage, TaskNotification, TaskStatusUpdate};
pub use types::*;
