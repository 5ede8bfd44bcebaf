use serde::{Deserialize, Serialize};

use crate::JobStatus;

/// Opaque identifier shared by jobs and project records.
pub type ProjectId = String;

/// One `(message, timestamp)` entry from a job's error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Full state of a job as reported by one poll response.
///
/// Snapshots are applied wholesale; a snapshot is never merged field by
/// field into an existing job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: String,
    pub files_generated: Vec<String>,
    pub errors: Vec<JobError>,
    pub created_at: String,
}

/// One in-flight generation request tracked from submission to terminal
/// status.
///
/// Created on submission acknowledgment; mutated only through
/// [`GenerationJob::apply_snapshot`]; immutable once `Completed` or
/// `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    id: ProjectId,
    description: String,
    status: JobStatus,
    progress: u8,
    peak_progress: u8,
    current_step: String,
    files_generated: Vec<String>,
    errors: Vec<JobError>,
    created_at: String,
}

impl GenerationJob {
    /// Creates a job in the `Submitted` state, before any snapshot lands.
    pub fn submitted(id: impl Into<ProjectId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: JobStatus::Submitted,
            progress: 0,
            peak_progress: 0,
            current_step: String::new(),
            files_generated: Vec::new(),
            errors: Vec::new(),
            created_at: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Progress exactly as last reported by the server.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// High-water progress mark; the server does not guarantee
    /// monotonicity, so progress views render this instead of
    /// [`GenerationJob::progress`].
    pub fn display_progress(&self) -> u8 {
        self.peak_progress
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn files_generated(&self) -> &[String] {
        &self.files_generated
    }

    pub fn errors(&self) -> &[JobError] {
        &self.errors
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Replaces the mutable fields wholesale with `snapshot`.
    ///
    /// Returns `false` without touching anything when the job is already
    /// terminal.
    pub fn apply_snapshot(&mut self, snapshot: JobSnapshot) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = snapshot.status;
        self.progress = snapshot.progress.min(100);
        self.peak_progress = self.peak_progress.max(self.progress);
        self.current_step = snapshot.current_step;
        self.files_generated = snapshot.files_generated;
        self.errors = snapshot.errors;
        self.created_at = snapshot.created_at;
        true
    }
}
