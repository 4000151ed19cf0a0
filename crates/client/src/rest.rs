//! REST collaborator used for baseline loads and push-triggered re-fetches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use taskwire_protocol::{DashboardAnalytics, Listing, ProjectRecord, TaskRecord};
use tracing::{debug, warn};

use crate::config::Origin;
use crate::error::RestError;
use crate::token::SessionToken;

pub const TASKS_PATH: &str = "/api/tasks/";
pub const PROJECTS_PATH: &str = "/api/projects/";
pub const PROJECT_ANALYTICS_PATH: &str = "/api/projects/analytics/";
pub const TASK_ANALYTICS_PATH: &str = "/api/tasks/analytics/";

/// Upper bound on one collection GET, body included. Chat streams are not
/// subject to it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Collection endpoints the subscriber depends on.
/// Real implementation: `HttpCollaborator`. Tests use in-memory doubles.
#[async_trait]
pub trait RestCollaborator: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, RestError>;

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, RestError>;

    async fn analytics(&self) -> Result<DashboardAnalytics, RestError>;
}

#[async_trait]
impl<T: RestCollaborator + ?Sized> RestCollaborator for Arc<T> {
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, RestError> {
        (**self).list_tasks().await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, RestError> {
        (**self).list_projects().await
    }

    async fn analytics(&self) -> Result<DashboardAnalytics, RestError> {
        (**self).analytics().await
    }
}

/// `reqwest`-backed collaborator authenticating with the session token
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    client: reqwest::Client,
    origin: Origin,
    token: Option<SessionToken>,
    request_timeout: Duration,
}

impl HttpCollaborator {
    pub fn new(origin: Origin, token: Option<SessionToken>) -> Result<Self, RestError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("taskwire/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            origin,
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub(crate) fn get(&self, path: &str) -> Result<RequestBuilder, RestError> {
        let url = self.origin.api_url(path)?;
        Ok(self.authorize(self.client.get(url).timeout(self.request_timeout)))
    }

    pub(crate) fn post(&self, path: &str) -> Result<RequestBuilder, RestError> {
        let url = self.origin.api_url(path)?;
        Ok(self.authorize(self.client.post(url)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let response = self.get(path)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                component = "rest",
                event = "rest.request.failed",
                endpoint = path,
                status = status.as_u16(),
                "REST request failed"
            );
            return Err(RestError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        debug!(
            component = "rest",
            event = "rest.request.ok",
            endpoint = path,
            body_bytes = body.len(),
        );
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl RestCollaborator for HttpCollaborator {
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, RestError> {
        let listing: Listing<TaskRecord> = self.get_json(TASKS_PATH).await?;
        Ok(listing.into_vec())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, RestError> {
        let listing: Listing<ProjectRecord> = self.get_json(PROJECTS_PATH).await?;
        Ok(listing.into_vec())
    }

    async fn analytics(&self) -> Result<DashboardAnalytics, RestError> {
        let (projects, tasks) = futures::try_join!(
            self.get_json::<serde_json::Value>(PROJECT_ANALYTICS_PATH),
            self.get_json::<serde_json::Value>(TASK_ANALYTICS_PATH),
        )?;
        Ok(DashboardAnalytics { projects, tasks })
    }
}
