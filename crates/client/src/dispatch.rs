//! Reconciliation of push events with cached view state
//!
//! `reconcile(screen, state, event) -> effects` patches the view state in
//! place where the payload is authoritative and returns the side effects
//! (notices, re-fetches) for the subscriber to carry out. No IO happens here.

use taskwire_protocol::{NotificationEvent, TaskNotification, TaskStatusUpdate};
use tracing::debug;

use crate::notice::Notice;
use crate::view_state::{Collection, Screen, ViewState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Notify(Notice),
    Refetch(Collection),
}

pub fn reconcile(screen: Screen, state: &mut ViewState, event: &NotificationEvent) -> Vec<Effect> {
    match event {
        NotificationEvent::TaskStatusUpdate(update) => status_update(screen, state, update),
        NotificationEvent::TaskNotification(note) => notification(screen, note),
        NotificationEvent::Unrecognized { kind, .. } => {
            debug!(
                component = "dispatch",
                event = "dispatch.unrecognized",
                kind = %kind,
                screen = ?screen,
                "Ignoring unrecognized event"
            );
            Vec::new()
        }
    }
}

fn status_update(screen: Screen, state: &mut ViewState, update: &TaskStatusUpdate) -> Vec<Effect> {
    if !screen.follows_status_updates() {
        debug!(
            component = "dispatch",
            event = "dispatch.status_update_ignored",
            task_id = update.task_id,
            screen = ?screen,
        );
        return Vec::new();
    }

    let patched = state.tasks.patch_status(update.task_id, &update.status);
    debug!(
        component = "dispatch",
        event = "dispatch.status_update",
        task_id = update.task_id,
        status = %update.status,
        patched,
    );

    let mut effects = vec![Effect::Notify(Notice::info(format!(
        "Task \"{}\" status updated to {}",
        update.task_data.title, update.status
    )))];
    effects.extend(
        screen
            .status_aggregates()
            .iter()
            .copied()
            .map(Effect::Refetch),
    );
    effects
}

fn notification(screen: Screen, note: &TaskNotification) -> Vec<Effect> {
    debug!(
        component = "dispatch",
        event = "dispatch.notification",
        task_id = ?note.task_id,
        action = ?note.action,
    );
    let mut effects = vec![Effect::Notify(Notice::info(note.message.clone()))];
    effects.extend(screen.primary().iter().copied().map(Effect::Refetch));
    effects
}
