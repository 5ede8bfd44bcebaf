use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use siteforge_core::{project, GenerationJob, ProjectId, ProjectRecord, StatusFilter};
use thiserror::Error;

use crate::api::SubmitRequest;
use crate::client::{ApiClient, ApiError, ClientSettings, HttpApiClient};
use crate::poller::{JobEvent, JobPoller};
use crate::preview::{PreviewError, PreviewSession, PreviewSessionManager};
use crate::repository::{DeleteError, ProjectRepository};

/// Submission failed; no job was recorded and nothing retries
/// automatically. The caller resubmits explicitly.
#[derive(Debug, Error)]
#[error("submission failed: {0}")]
pub struct SubmissionError(#[from] pub ApiError);

/// Front door of the client engine.
///
/// Accepts generation requests, hands new jobs to the poller, and routes
/// preview/download/delete actions to the repository and preview manager.
pub struct ForgeHandle {
    client: Arc<dyn ApiClient>,
    repository: Arc<ProjectRepository>,
    poller: JobPoller,
    previews: PreviewSessionManager,
}

impl ForgeHandle {
    /// Connects to the service described by `settings`.
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let poll_interval = settings.poll_interval;
        let client: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(settings)?);
        Ok(Self::with_client(client, poll_interval))
    }

    /// Builds the engine over any [`ApiClient`] implementation.
    pub fn with_client(client: Arc<dyn ApiClient>, poll_interval: Duration) -> Self {
        let repository = Arc::new(ProjectRepository::new(Arc::clone(&client)));
        let poller = JobPoller::with_interval(
            Arc::clone(&client),
            Arc::clone(&repository),
            poll_interval,
        );
        let previews = PreviewSessionManager::new(Arc::clone(&client), Arc::clone(&repository));
        Self {
            client,
            repository,
            poller,
            previews,
        }
    }

    pub fn repository(&self) -> &Arc<ProjectRepository> {
        &self.repository
    }

    /// Submits a generation request and begins tracking the new job.
    pub async fn submit(
        &self,
        description: &str,
        requirements: Vec<String>,
        style_preferences: serde_json::Value,
    ) -> Result<ProjectId, SubmissionError> {
        let request = SubmitRequest {
            description: description.to_string(),
            requirements,
            style_preferences,
        };
        let ack = self.client.submit(&request).await?;
        let job = GenerationJob::submitted(ack.project_id.clone(), description);
        self.repository.apply_job_snapshot(&job);
        self.poller.track(job);
        Ok(ack.project_id)
    }

    /// Cached records, repository order.
    pub fn projects(&self) -> Vec<ProjectRecord> {
        self.repository.list()
    }

    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.repository.refresh().await
    }

    /// Filtered projection of the cached collection for the gallery view.
    pub fn gallery(&self, search_term: &str, filter: StatusFilter) -> Vec<ProjectRecord> {
        let records = self.repository.list();
        project(&records, search_term, filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Deletes the project remotely. Only a confirmed delete removes the
    /// record, stops its poll loop, and drops its preview session.
    pub async fn delete(&self, id: &str) -> Result<(), DeleteError> {
        self.repository.delete(id).await?;
        self.poller.stop(id);
        self.previews.invalidate(id);
        Ok(())
    }

    pub async fn preview(&self, id: &str) -> Result<PreviewSession, PreviewError> {
        self.previews.start(id).await
    }

    pub async fn restart_preview(&self, id: &str) -> Result<PreviewSession, PreviewError> {
        self.previews.restart(id).await
    }

    pub fn preview_url(&self, id: &str) -> Option<String> {
        self.previews.url_for(id)
    }

    pub async fn stop_preview(&self, id: &str) {
        self.previews.stop(id).await;
    }

    /// URL handoff; opening it is a presentation-layer concern.
    pub fn download_url(&self, id: &str) -> String {
        self.client.download_url(id)
    }

    pub fn preview_content_url(&self, id: &str) -> String {
        self.client.preview_content_url(id)
    }

    pub async fn project_files(&self, id: &str) -> Result<BTreeMap<String, String>, ApiError> {
        self.client.project_files(id).await
    }

    /// Navigate-away cancellation; advisory to this client only.
    pub fn stop_tracking(&self, id: &str) {
        self.poller.stop(id);
    }

    pub fn is_tracking(&self, id: &str) -> bool {
        self.poller.is_tracking(id)
    }

    /// Drains one pending job event without blocking.
    pub fn try_recv(&self) -> Option<JobEvent> {
        self.poller.try_recv()
    }
}
