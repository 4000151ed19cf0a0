//! Transient user-facing notices (toasts).

use std::time::Duration;

use tokio::time::Instant;

/// How long a notice stays visible
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub ttl: Duration,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
            ttl: NOTICE_TTL,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
            ttl: NOTICE_TTL,
        }
    }
}

#[derive(Debug, Clone)]
struct Posted {
    notice: Notice,
    expires_at: Instant,
}

/// Notices currently on screen, oldest first
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    posted: Vec<Posted>,
}

impl NoticeBoard {
    pub fn post(&mut self, notice: Notice, now: Instant) {
        let expires_at = now + notice.ttl;
        self.posted.push(Posted { notice, expires_at });
    }

    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notice> {
        self.posted
            .iter()
            .filter(move |p| p.expires_at > now)
            .map(|p| &p.notice)
    }

    /// Forget expired notices; returns how many were removed.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.posted.len();
        self.posted.retain(|p| p.expires_at > now);
        before - self.posted.len()
    }

    /// When the next visible notice disappears
    pub fn next_expiry(&self) -> Option<Instant> {
        self.posted.iter().map(|p| p.expires_at).min()
    }

    pub fn is_empty(&self) -> bool {
        self.posted.is_empty()
    }
}
