//! Server → Client frames on `/ws/tasks/`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::*;

/// A task's status changed; the payload is authoritative for `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub task_id: EntityId,
    pub status: String,
    pub task_data: TaskSnapshot,
}

/// Generic task/project notification meant for display and re-fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNotification {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<TaskAction>,
}

/// Frames the client knows how to interpret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    TaskStatusUpdate(TaskStatusUpdate),
    TaskNotification(TaskNotification),
}

impl ServerMessage {
    /// Wire names of every variant
    pub const KINDS: &'static [&'static str] = &["task_status_update", "task_notification"];

    pub fn is_known_kind(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }
}

/// A decoded frame: one case per known kind plus a catch-all.
///
/// Unknown kinds are kept with their raw payload so the consumer, not the
/// decoder, decides whether they matter.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    TaskStatusUpdate(TaskStatusUpdate),
    TaskNotification(TaskNotification),
    Unrecognized { kind: String, payload: Value },
}

impl NotificationEvent {
    /// Wire name of the frame this event came from
    pub fn kind(&self) -> &str {
        match self {
            NotificationEvent::TaskStatusUpdate(_) => "task_status_update",
            NotificationEvent::TaskNotification(_) => "task_notification",
            NotificationEvent::Unrecognized { kind, .. } => kind,
        }
    }
}

impl From<ServerMessage> for NotificationEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::TaskStatusUpdate(update) => NotificationEvent::TaskStatusUpdate(update),
            ServerMessage::TaskNotification(note) => NotificationEvent::TaskNotification(note),
        }
    }
}
