use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use siteforge_core::{JobSnapshot, ProjectRecord};
use thiserror::Error;
use url::Url;

use crate::api::{PreviewAck, ProjectFiles, ProjectListing, StatusPayload, SubmitAck, SubmitRequest};

/// Connection settings for the generation service.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Delay between a poll's completion and the next poll's start.
    pub poll_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:8000/api/v1/").expect("static base url"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl ClientSettings {
    /// Settings against an arbitrary service root. The path is normalized
    /// to end in `/` so endpoint joins resolve under it.
    pub fn for_base_url(raw: &str) -> Result<Self, ApiError> {
        let mut text = raw.trim().to_string();
        if !text.ends_with('/') {
            text.push('/');
        }
        let base_url = Url::parse(&text).map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("timeout")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Seam to the remote generation service; everything above the transport
/// (poller, repository, preview manager) runs against this trait.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitAck, ApiError>;
    async fn job_status(&self, project_id: &str) -> Result<JobSnapshot, ApiError>;
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, ApiError>;
    async fn gallery(&self) -> Result<Vec<ProjectRecord>, ApiError>;
    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError>;
    async fn start_preview(&self, project_id: &str) -> Result<PreviewAck, ApiError>;
    async fn stop_preview(&self, project_id: &str) -> Result<PreviewAck, ApiError>;
    async fn project_files(&self, project_id: &str) -> Result<BTreeMap<String, String>, ApiError>;

    /// URL the presentation layer opens to download the ZIP artifact.
    /// The artifact itself is never fetched in-process.
    fn download_url(&self, project_id: &str) -> String;

    /// URL serving the embeddable preview document.
    fn preview_content_url(&self, project_id: &str) -> String;
}

/// `reqwest`-backed [`ApiClient`].
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    settings: ClientSettings,
    http: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.settings
            .base_url
            .join(path)
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))
    }

    fn unchecked_endpoint(&self, path: &str) -> String {
        match self.settings.base_url.join(path) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.settings.base_url, path),
        }
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitAck, ApiError> {
        let url = self.endpoint("generate")?;
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::check(response)?
            .json::<SubmitAck>()
            .await
            .map_err(map_reqwest_error)
    }

    async fn job_status(&self, project_id: &str) -> Result<JobSnapshot, ApiError> {
        let url = self.endpoint(&format!("projects/{project_id}/status"))?;
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let payload = Self::check(response)?
            .json::<StatusPayload>()
            .await
            .map_err(map_reqwest_error)?;
        Ok(payload.into_snapshot())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, ApiError> {
        let url = self.endpoint("projects")?;
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let listing = Self::check(response)?
            .json::<ProjectListing>()
            .await
            .map_err(map_reqwest_error)?;
        Ok(listing.projects)
    }

    async fn gallery(&self) -> Result<Vec<ProjectRecord>, ApiError> {
        let url = self.endpoint("projects/gallery")?;
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let listing = Self::check(response)?
            .json::<ProjectListing>()
            .await
            .map_err(map_reqwest_error)?;
        Ok(listing.projects)
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("projects/{project_id}"))?;
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::check(response)?;
        Ok(())
    }

    async fn start_preview(&self, project_id: &str) -> Result<PreviewAck, ApiError> {
        let url = self.endpoint(&format!("projects/{project_id}/preview/start"))?;
        let response = self
            .http
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::check(response)?
            .json::<PreviewAck>()
            .await
            .map_err(map_reqwest_error)
    }

    async fn stop_preview(&self, project_id: &str) -> Result<PreviewAck, ApiError> {
        let url = self.endpoint(&format!("projects/{project_id}/preview/stop"))?;
        let response = self
            .http
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::check(response)?
            .json::<PreviewAck>()
            .await
            .map_err(map_reqwest_error)
    }

    async fn project_files(&self, project_id: &str) -> Result<BTreeMap<String, String>, ApiError> {
        let url = self.endpoint(&format!("projects/{project_id}/files"))?;
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let payload = Self::check(response)?
            .json::<ProjectFiles>()
            .await
            .map_err(map_reqwest_error)?;
        Ok(payload.files)
    }

    fn download_url(&self, project_id: &str) -> String {
        self.unchecked_endpoint(&format!("projects/{project_id}/download"))
    }

    fn preview_content_url(&self, project_id: &str) -> String {
        self.unchecked_endpoint(&format!("projects/{project_id}/preview-content"))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    if err.is_decode() {
        return ApiError::Decode(err.to_string());
    }
    ApiError::Network(err.to_string())
}
