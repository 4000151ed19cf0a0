//! Core types shared across the protocol

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary key of a task or project as issued by the backend
pub type EntityId = i64;

/// What happened to a task, as reported by `task_notification`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    Created,
    Updated,
    Deleted,
    /// Any action the backend adds later
    #[serde(other)]
    Other,
}

/// A task as returned by `GET /api/tasks/`.
///
/// Only the fields the notification channel touches are typed; everything
/// else the backend sends is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A project as returned by `GET /api/projects/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Task details attached to a `task_status_update` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A REST collection body: either a bare array or a paginated wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    /// Normalize either shape to the list of records
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Page { results } => results,
        }
    }
}

/// Dashboard aggregates from the two analytics endpoints.
///
/// The payloads feed charts this crate does not render, so they stay opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardAnalytics {
    pub projects: Value,
    pub tasks: Value,
}
