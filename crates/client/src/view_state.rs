//! Per-screen entity caches.
//!
//! Owned by exactly one subscriber. Changed only by the dispatcher's
//! status patch or by replacing a whole collection after a re-fetch.

use std::collections::BTreeMap;

use taskwire_protocol::{DashboardAnalytics, EntityId, ProjectRecord, TaskRecord};

pub trait Entity {
    fn id(&self) -> EntityId;
}

impl Entity for TaskRecord {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for ProjectRecord {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// A REST collection the subscriber can (re-)fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tasks,
    Projects,
    Analytics,
}

impl Collection {
    /// Human-readable name used in notices
    pub fn label(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Projects => "projects",
            Collection::Analytics => "dashboard data",
        }
    }
}

/// The screens that keep a notification channel open
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Screen {
    Tasks,
    Projects,
    Dashboard,
}

impl Screen {
    /// Collections fetched on mount
    pub fn baseline(self) -> &'static [Collection] {
        match self {
            Screen::Tasks => &[Collection::Tasks, Collection::Projects],
            Screen::Projects => &[Collection::Projects],
            Screen::Dashboard => &[Collection::Analytics],
        }
    }

    /// Collections replaced when a `task_notification` arrives
    pub fn primary(self) -> &'static [Collection] {
        match self {
            Screen::Tasks => &[Collection::Tasks],
            Screen::Projects => &[Collection::Projects],
            Screen::Dashboard => &[Collection::Analytics],
        }
    }

    /// Whether `task_status_update` frames concern this screen at all.
    /// The dashboard only reacts to `task_notification`.
    pub fn follows_status_updates(self) -> bool {
        !matches!(self, Screen::Dashboard)
    }

    /// Cached aggregates derived from task status (per-project task counts).
    /// A status push cannot patch these, so they are re-fetched.
    pub fn status_aggregates(self) -> &'static [Collection] {
        match self {
            Screen::Tasks | Screen::Dashboard => &[],
            Screen::Projects => &[Collection::Projects],
        }
    }
}

/// id → record map for one collection
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCache<T> {
    entries: BTreeMap<EntityId, T>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Entity> EntityCache<T> {
    /// Swap in a freshly fetched collection wholesale
    pub fn replace_all(&mut self, records: Vec<T>) {
        self.entries = records.into_iter().map(|r| (r.id(), r)).collect();
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl EntityCache<TaskRecord> {
    /// Set one task's status; every other field is left alone.
    /// Returns whether the task was cached.
    pub fn patch_status(&mut self, id: EntityId, status: &str) -> bool {
        match self.entries.get_mut(&id) {
            Some(task) => {
                if task.status != status {
                    task.status = status.to_string();
                }
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub tasks: EntityCache<TaskRecord>,
    pub projects: EntityCache<ProjectRecord>,
    pub analytics: Option<DashboardAnalytics>,
}
