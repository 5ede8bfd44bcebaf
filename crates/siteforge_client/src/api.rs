use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use siteforge_core::{JobError, JobSnapshot, JobStatus};

/// Body of `POST /generate`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub description: String,
    pub requirements: Vec<String>,
    pub style_preferences: serde_json::Value,
}

/// Acknowledgment returned by `POST /generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAck {
    pub project_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Raw `GET /projects/{id}/status` payload, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    #[serde(rename = "project_id", alias = "id")]
    pub project_id: String,
    pub status: String,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub files_generated: Vec<String>,
    #[serde(default)]
    pub errors: Vec<WireJobError>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
}

/// The server appends errors both as bare strings and as
/// `{message, timestamp}` objects; accept either form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireJobError {
    Entry {
        message: String,
        #[serde(default)]
        timestamp: String,
    },
    Text(String),
}

impl From<WireJobError> for JobError {
    fn from(wire: WireJobError) -> Self {
        match wire {
            WireJobError::Entry { message, timestamp } => JobError { message, timestamp },
            WireJobError::Text(message) => JobError {
                message,
                timestamp: String::new(),
            },
        }
    }
}

impl StatusPayload {
    /// Normalizes the payload into a core snapshot.
    pub fn into_snapshot(self) -> JobSnapshot {
        JobSnapshot {
            status: JobStatus::parse(&self.status),
            progress: self.progress.clamp(0, 100) as u8,
            current_step: self.current_step,
            files_generated: self.files_generated,
            errors: self.errors.into_iter().map(JobError::from).collect(),
            created_at: self.created_at,
        }
    }
}

/// Envelope shared by the basic and gallery listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectListing {
    #[serde(default)]
    pub projects: Vec<siteforge_core::ProjectRecord>,
}

/// Response of `POST /projects/{id}/preview/start` and `/preview/stop`.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewAck {
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of `GET /projects/{id}/files`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFiles {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}
