use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use client_logging::client_warn;
use siteforge_core::{JobStatus, ProjectId};
use thiserror::Error;

use crate::client::{ApiClient, ApiError};
use crate::repository::ProjectRepository;

/// An ephemeral server-side process serving a completed project at a URL.
#[derive(Debug, Clone)]
pub struct PreviewSession {
    pub project_id: ProjectId,
    pub url: String,
    pub started_at: SystemTime,
}

#[derive(Debug, Error)]
pub enum PreviewError {
    /// The record is missing, not completed, or carries no preview. No
    /// network call was attempted.
    #[error("project {0} has no preview available")]
    Unavailable(ProjectId),
    /// The server answered but declined to start a session.
    #[error("preview start refused: {0}")]
    Refused(String),
    #[error("preview request failed: {0}")]
    Remote(#[from] ApiError),
}

/// Tracks at most one live preview session per project.
pub struct PreviewSessionManager {
    client: Arc<dyn ApiClient>,
    repository: Arc<ProjectRepository>,
    sessions: RwLock<HashMap<ProjectId, PreviewSession>>,
}

impl PreviewSessionManager {
    pub fn new(client: Arc<dyn ApiClient>, repository: Arc<ProjectRepository>) -> Self {
        Self {
            client,
            repository,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Starts a session for `project_id`, or returns the live one.
    ///
    /// A second server-side session is never created for an id that
    /// already has one; use [`restart`](Self::restart) to force a fresh
    /// session.
    pub async fn start(&self, project_id: &str) -> Result<PreviewSession, PreviewError> {
        self.check_previewable(project_id)?;
        if let Some(existing) = self.session_for(project_id) {
            return Ok(existing);
        }
        self.start_fresh(project_id).await
    }

    /// Explicitly supersedes any live session with a new one.
    pub async fn restart(&self, project_id: &str) -> Result<PreviewSession, PreviewError> {
        self.check_previewable(project_id)?;
        if self.session_for(project_id).is_some() {
            self.stop(project_id).await;
        }
        self.start_fresh(project_id).await
    }

    /// Synchronous URL lookup; no network.
    pub fn url_for(&self, project_id: &str) -> Option<String> {
        self.session_for(project_id).map(|session| session.url)
    }

    /// Best-effort stop: the local entry is removed even when the remote
    /// call fails, so bookkeeping never sticks to a dead session.
    pub async fn stop(&self, project_id: &str) {
        let had_session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(project_id)
            .is_some();
        if !had_session {
            return;
        }
        match self.client.stop_preview(project_id).await {
            Ok(ack) if !ack.success => client_warn!(
                "remote preview stop refused for {}: {}",
                project_id,
                ack.error.unwrap_or_default()
            ),
            Ok(_) => {}
            Err(err) => client_warn!("remote preview stop failed for {}: {}", project_id, err),
        }
    }

    /// Drops the local entry without a network call; the next
    /// [`start`](Self::start) re-requests a session. Used when the record
    /// went away or the consumer navigated away long enough for the
    /// session to be presumed stale.
    pub fn invalidate(&self, project_id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(project_id);
    }

    fn session_for(&self, project_id: &str) -> Option<PreviewSession> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(project_id)
            .cloned()
    }

    fn check_previewable(&self, project_id: &str) -> Result<(), PreviewError> {
        match self.repository.find(project_id) {
            Some(record) if record.status == JobStatus::Completed && record.has_preview => Ok(()),
            _ => Err(PreviewError::Unavailable(project_id.to_string())),
        }
    }

    async fn start_fresh(&self, project_id: &str) -> Result<PreviewSession, PreviewError> {
        let ack = self.client.start_preview(project_id).await?;
        if !ack.success {
            return Err(PreviewError::Refused(
                ack.error.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        let url = ack
            .url
            .ok_or_else(|| PreviewError::Refused("no url in response".to_string()))?;
        let session = PreviewSession {
            project_id: project_id.to_string(),
            url,
            started_at: SystemTime::now(),
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project_id.to_string(), session.clone());
        Ok(session)
    }
}
