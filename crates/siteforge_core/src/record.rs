use serde::{Deserialize, Serialize};

use crate::{GenerationJob, JobStatus, ProjectId};

/// Server-owned metadata block of a gallery record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub website_type: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(rename = "file_size", default)]
    pub file_size_bytes: u64,
}

/// The persisted, server-owned representation of a (possibly completed)
/// generation artifact.
///
/// Decodes from both the basic listing and the gallery listing; fields the
/// basic listing omits fall back to their defaults and are filled in by
/// the next gallery refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(rename = "project_id", alias = "id")]
    pub id: ProjectId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "crate::status::lenient", default)]
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub has_preview: bool,
    #[serde(default)]
    pub metadata: ProjectMetadata,
}

impl ProjectRecord {
    /// Derives the provisional record published between poll snapshots.
    ///
    /// Overwritten wholesale by the next full refresh; the server listing
    /// stays authoritative for titles, counts, and metadata.
    pub fn provisional(job: &GenerationJob) -> Self {
        Self {
            id: job.id().to_string(),
            title: String::new(),
            description: job.description().to_string(),
            status: job.status(),
            created_at: job.created_at().to_string(),
            updated_at: String::new(),
            file_count: job.files_generated().len() as u64,
            has_preview: job.status() == JobStatus::Completed,
            metadata: ProjectMetadata::default(),
        }
    }
}
