//! View subscriber: one screen's state plus its notification channel.
//!
//! A subscriber loads its baseline over REST on mount, independent of the
//! socket, then opens exactly one connection. All mutation happens on the
//! task that drives the subscriber; after `unmount` nothing is applied.
//!
//! Re-fetches are awaited where they are triggered, raced against the
//! shutdown signal inside `run`. If the same collection
//! is also refreshed from elsewhere (another subscriber, a manual refresh
//! racing a push), whichever response is applied last wins, even if it is
//! the staler one.

use std::future::Future;

use taskwire_protocol::{DashboardAnalytics, NotificationEvent, ProjectRecord, TaskRecord};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Origin;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::decoder::decode;
use crate::dispatch::{reconcile, Effect};
use crate::error::RestError;
use crate::notice::{Notice, NoticeBoard};
use crate::rest::RestCollaborator;
use crate::token::SessionToken;
use crate::transport::Connector;
use crate::view_state::{Collection, Screen, ViewState};

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The shutdown future resolved
    Shutdown,
    /// The socket is gone and no notice is left to expire
    ChannelClosed,
}

pub struct ViewSubscriber<C, R> {
    screen: Screen,
    connection: ConnectionManager<C>,
    rest: R,
    token: Option<SessionToken>,
    state: ViewState,
    notices: NoticeBoard,
    mounted: bool,
}

impl<C: Connector, R: RestCollaborator> ViewSubscriber<C, R> {
    /// Load the baseline, then open the channel when a token is available.
    pub async fn mount(
        screen: Screen,
        connector: C,
        origin: Origin,
        rest: R,
        token: Option<SessionToken>,
    ) -> Self {
        let mut subscriber = Self {
            screen,
            connection: ConnectionManager::new(connector, origin),
            rest,
            token,
            state: ViewState::default(),
            notices: NoticeBoard::default(),
            mounted: true,
        };
        info!(
            component = "subscriber",
            event = "view.mounted",
            screen = ?screen,
        );
        subscriber.refresh().await;
        subscriber.connect();
        subscriber
    }

    /// Close any live connection, reload the baseline, and reconnect.
    pub async fn remount(&mut self) {
        self.connection.close();
        self.mounted = true;
        self.refresh().await;
        self.connect();
    }

    fn connect(&mut self) {
        if let Err(e) = self.connection.open(self.token.as_ref()) {
            info!(
                component = "subscriber",
                event = "view.live_updates_unavailable",
                screen = ?self.screen,
                reason = %e,
                "Live updates unavailable, showing REST data only"
            );
        }
    }

    /// Re-fetch every baseline collection of this screen
    pub async fn refresh(&mut self) {
        for collection in self.screen.baseline() {
            self.refetch(*collection).await;
        }
    }

    async fn refetch(&mut self, collection: Collection) {
        if !self.mounted {
            return;
        }
        let result = match collection {
            Collection::Tasks => self.rest.list_tasks().await.map(Fetched::Tasks),
            Collection::Projects => self.rest.list_projects().await.map(Fetched::Projects),
            Collection::Analytics => self.rest.analytics().await.map(Fetched::Analytics),
        };
        if !self.mounted {
            return;
        }
        match result {
            Ok(Fetched::Tasks(tasks)) => self.state.tasks.replace_all(tasks),
            Ok(Fetched::Projects(projects)) => self.state.projects.replace_all(projects),
            Ok(Fetched::Analytics(analytics)) => self.state.analytics = Some(analytics),
            Err(e) => self.fetch_failed(collection, &e),
        }
    }

    fn fetch_failed(&mut self, collection: Collection, error: &RestError) {
        warn!(
            component = "subscriber",
            event = "view.refetch_failed",
            screen = ?self.screen,
            collection = collection.label(),
            error = %error,
            "Keeping last known state"
        );
        self.notices
            .post(Notice::error(error.user_message(collection.label())), Instant::now());
    }

    /// Decode one raw frame and reconcile it with the view state.
    pub async fn handle_frame(&mut self, raw: &str) {
        if !self.mounted {
            return;
        }
        if let Some(event) = decode(raw) {
            self.handle_event(&event).await;
        }
    }

    pub async fn handle_event(&mut self, event: &NotificationEvent) {
        if !self.mounted {
            return;
        }
        debug!(
            component = "subscriber",
            event = "view.event",
            kind = event.kind(),
            screen = ?self.screen,
        );
        let effects = reconcile(self.screen, &mut self.state, event);
        for effect in effects {
            match effect {
                Effect::Notify(notice) => self.notices.post(notice, Instant::now()),
                Effect::Refetch(collection) => self.refetch(collection).await,
            }
        }
    }

    /// Wait for and apply the next frame. `false` once the channel is closed.
    pub async fn next_frame(&mut self) -> bool {
        match self.connection.recv().await {
            Some(raw) => {
                self.handle_frame(&raw).await;
                true
            }
            None => false,
        }
    }

    /// Drive the subscriber until `shutdown` resolves or there is nothing
    /// left to show. `render` runs after every change, including a notice
    /// expiring.
    pub async fn run<S, F>(&mut self, shutdown: S, mut render: F) -> RunExit
    where
        S: Future<Output = ()>,
        F: FnMut(&Self),
    {
        tokio::pin!(shutdown);
        render(&*self);

        loop {
            if !self.connection.is_live() && self.notices.is_empty() {
                return RunExit::ChannelClosed;
            }
            let expiry = self.notices.next_expiry();

            tokio::select! {
                _ = &mut shutdown => return RunExit::Shutdown,
                frame = self.connection.recv(), if self.connection.is_live() => {
                    if let Some(raw) = frame {
                        // A re-fetch may stall; shutdown still wins.
                        tokio::select! {
                            _ = &mut shutdown => return RunExit::Shutdown,
                            _ = self.handle_frame(&raw) => {}
                        }
                    }
                }
                _ = tokio::time::sleep_until(expiry.unwrap_or_else(Instant::now)), if expiry.is_some() => {
                    self.notices.prune(Instant::now());
                }
            }
            render(&*self);
        }
    }

    /// Close the channel; nothing is applied to this view afterwards.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.connection.close();
        info!(
            component = "subscriber",
            event = "view.unmounted",
            screen = ?self.screen,
        );
    }
}

impl<C, R> ViewSubscriber<C, R> {
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Why the channel last closed or failed to open
    pub fn last_error(&self) -> Option<&str> {
        self.connection.last_error()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Notices still visible now
    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.visible(Instant::now())
    }
}

enum Fetched {
    Tasks(Vec<TaskRecord>),
    Projects(Vec<ProjectRecord>),
    Analytics(DashboardAnalytics),
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::notice::NoticeLevel;
    use crate::test_support::{ScriptedConnector, ScriptedSocket};
    use crate::transport::TransportEvent;

    #[derive(Default)]
    struct FakeRest {
        tasks: Mutex<Vec<TaskRecord>>,
        projects: Mutex<Vec<ProjectRecord>>,
        fail: AtomicBool,
        hang: AtomicBool,
        calls: Mutex<Vec<Collection>>,
    }

    impl FakeRest {
        fn with_tasks(tasks: serde_json::Value) -> Arc<Self> {
            let rest = Self::default();
            *rest.tasks.lock().unwrap() = serde_json::from_value(tasks).unwrap();
            Arc::new(rest)
        }

        fn record(&self, collection: Collection) -> Result<(), RestError> {
            self.calls.lock().unwrap().push(collection);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RestError::Status {
                    endpoint: "/api/tasks/".into(),
                    status: 500,
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<Collection> {
            self.calls.lock().unwrap().clone()
        }

        fn clear_calls(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl RestCollaborator for FakeRest {
        async fn list_tasks(&self) -> Result<Vec<TaskRecord>, RestError> {
            self.record(Collection::Tasks)?;
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn list_projects(&self) -> Result<Vec<ProjectRecord>, RestError> {
            self.record(Collection::Projects)?;
            Ok(self.projects.lock().unwrap().clone())
        }

        async fn analytics(&self) -> Result<DashboardAnalytics, RestError> {
            self.record(Collection::Analytics)?;
            Ok(DashboardAnalytics::default())
        }
    }

    type Subscriber = ViewSubscriber<ScriptedConnector, Arc<FakeRest>>;

    fn origin() -> Origin {
        Origin::parse("http://localhost:8000").unwrap()
    }

    async fn mount_tasks(
        rest: &Arc<FakeRest>,
        token: Option<&str>,
    ) -> (Subscriber, ScriptedConnector, ScriptedSocket) {
        let connector = ScriptedConnector::new();
        let socket = connector.socket();
        let subscriber = ViewSubscriber::mount(
            Screen::Tasks,
            connector.clone(),
            origin(),
            rest.clone(),
            token.map(SessionToken::new),
        )
        .await;
        socket.push(TransportEvent::Opened);
        (subscriber, connector, socket)
    }

    fn report_task() -> serde_json::Value {
        json!([
            {"id": 42, "title": "Write report", "status": "in_progress", "priority": "high"},
            {"id": 43, "title": "Review", "status": "todo"}
        ])
    }

    #[tokio::test]
    async fn mount_loads_baseline_and_opens_one_connection() {
        let rest = FakeRest::with_tasks(report_task());
        let (sub, connector, _socket) = mount_tasks(&rest, Some("tok")).await;

        assert_eq!(rest.calls(), vec![Collection::Tasks, Collection::Projects]);
        assert_eq!(sub.state().tasks.len(), 2);
        assert_eq!(connector.connect_calls(), 1);
        assert_eq!(sub.connection_state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn mount_without_token_is_rest_only() {
        let rest = FakeRest::with_tasks(report_task());
        let (sub, connector, _socket) = mount_tasks(&rest, None).await;

        assert_eq!(sub.state().tasks.len(), 2);
        assert_eq!(connector.connect_calls(), 0);
        assert_eq!(sub.connection_state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn status_update_patches_task_from_socket() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, socket) = mount_tasks(&rest, Some("tok")).await;
        rest.clear_calls();

        socket.frame(
            r#"{"type":"task_status_update","task_id":42,"status":"completed","task_data":{"title":"Write report"}}"#,
        );
        assert!(sub.next_frame().await);

        let task = sub.state().tasks.get(42).unwrap();
        assert_eq!(task.status, "completed");
        assert_eq!(task.extra["priority"], "high");
        assert_eq!(sub.state().tasks.get(43).unwrap().status, "todo");
        assert!(rest.calls().is_empty());

        let texts: Vec<_> = sub.notices().map(|n| n.text.clone()).collect();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Write report") && texts[0].contains("completed"));
    }

    #[tokio::test(start_paused = true)]
    async fn notification_refetches_tasks_and_notice_expires() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, socket) = mount_tasks(&rest, Some("tok")).await;
        rest.clear_calls();

        socket.frame(r#"{"type":"task_notification","message":"New task assigned"}"#);
        assert!(sub.next_frame().await);

        assert_eq!(rest.calls(), vec![Collection::Tasks]);
        let texts: Vec<_> = sub.notices().map(|n| n.text.clone()).collect();
        assert_eq!(texts, ["New task assigned"]);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(sub.notices().count(), 0);
    }

    #[tokio::test]
    async fn unrecognized_and_malformed_frames_change_nothing() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, socket) = mount_tasks(&rest, Some("tok")).await;
        rest.clear_calls();
        let before = sub.state().clone();

        socket.frame(r#"{"type":"ping"}"#);
        socket.frame("{not json");
        socket.frame(r#"{"type":"task_status_update","task_id":42}"#);
        for _ in 0..3 {
            assert!(sub.next_frame().await);
        }

        assert_eq!(sub.state(), &before);
        assert!(rest.calls().is_empty());
        assert_eq!(sub.notices().count(), 0);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_state_and_posts_error() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, socket) = mount_tasks(&rest, Some("tok")).await;
        let before = sub.state().clone();

        rest.fail.store(true, Ordering::SeqCst);
        *rest.tasks.lock().unwrap() = Vec::new();
        socket.frame(r#"{"type":"task_notification","message":"Task 'Review' was deleted"}"#);
        assert!(sub.next_frame().await);

        assert_eq!(sub.state(), &before);
        let errors: Vec<_> = sub
            .notices()
            .filter(|n| n.level == NoticeLevel::Error)
            .map(|n| n.text.clone())
            .collect();
        assert_eq!(errors, ["Failed to fetch tasks"]);
    }

    #[tokio::test]
    async fn unmount_closes_and_ignores_later_frames() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, socket) = mount_tasks(&rest, Some("tok")).await;
        let before = sub.state().clone();

        sub.unmount();
        assert!(socket.is_dropped());
        assert_eq!(sub.connection_state(), ConnectionState::Closed);

        sub.handle_frame(
            r#"{"type":"task_status_update","task_id":42,"status":"completed","task_data":{"title":"Write report"}}"#,
        )
        .await;
        assert!(!sub.next_frame().await);
        sub.refresh().await;

        assert_eq!(sub.state(), &before);
        assert_eq!(sub.notices().count(), 0);
        sub.unmount();
    }

    #[tokio::test]
    async fn remount_closes_before_reopening() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, connector, first) = mount_tasks(&rest, Some("tok")).await;
        let second = connector.socket();
        rest.clear_calls();

        sub.remount().await;

        assert!(first.is_dropped());
        assert!(!second.is_dropped());
        assert_eq!(connector.connect_calls(), 2);
        assert_eq!(rest.calls(), vec![Collection::Tasks, Collection::Projects]);
        assert!(sub.is_mounted());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_stalled_refetch() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, socket) = mount_tasks(&rest, Some("tok")).await;
        rest.hang.store(true, Ordering::SeqCst);

        socket.frame(r#"{"type":"task_notification","message":"New task assigned"}"#);
        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let exit = tokio::time::timeout(Duration::from_secs(2), sub.run(shutdown, |_| {}))
            .await
            .expect("run kept waiting on the re-fetch after shutdown");

        assert_eq!(exit, RunExit::Shutdown);
        sub.unmount();
        assert_eq!(sub.connection_state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn dashboard_ignores_status_updates() {
        let rest = FakeRest::with_tasks(report_task());
        let connector = ScriptedConnector::new();
        let socket = connector.socket();
        let mut sub = ViewSubscriber::mount(
            Screen::Dashboard,
            connector,
            origin(),
            rest.clone(),
            Some(SessionToken::new("tok")),
        )
        .await;
        rest.clear_calls();

        socket.push(TransportEvent::Opened);
        socket.frame(
            r#"{"type":"task_status_update","task_id":42,"status":"completed","task_data":{"title":"Write report"}}"#,
        );
        assert!(sub.next_frame().await);

        assert!(rest.calls().is_empty());
        assert_eq!(sub.notices().count(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, _socket) = mount_tasks(&rest, Some("tok")).await;

        let mut renders = 0;
        let exit = sub.run(async {}, |_| renders += 1).await;

        assert_eq!(exit, RunExit::Shutdown);
        assert_eq!(renders, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_when_channel_closes_and_notices_expire() {
        let rest = FakeRest::with_tasks(report_task());
        let (mut sub, _connector, socket) = mount_tasks(&rest, Some("tok")).await;

        socket.frame(
            r#"{"type":"task_status_update","task_id":43,"status":"review","task_data":{"title":"Review"}}"#,
        );
        socket.push(TransportEvent::Closed { reason: None });

        let mut seen_notice = false;
        let exit = sub
            .run(std::future::pending(), |s| {
                seen_notice |= s.notices().count() > 0;
            })
            .await;

        assert_eq!(exit, RunExit::ChannelClosed);
        assert!(seen_notice);
        assert_eq!(sub.state().tasks.get(43).unwrap().status, "review");
        assert_eq!(sub.connection_state(), ConnectionState::Closed);
    }
}
