use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of a generation job or project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Submission acknowledged; no poll snapshot observed yet.
    Submitted,
    Queued,
    Running,
    Completed,
    Failed,
    /// The server reported a status string this client does not recognize.
    Unknown,
}

impl JobStatus {
    /// Normalizes a server status string.
    ///
    /// The server is loose about its vocabulary: projects are created as
    /// `created`, acknowledged as `started`, and polled as `in_progress`
    /// while the crew runs. Anything unrecognized maps to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" | "started" | "queued" => Self::Queued,
            "running" | "in_progress" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// `Completed` and `Failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Deserializes a status through [`JobStatus::parse`] instead of the
/// closed enum form, so unrecognized wire strings decode as `Unknown`.
pub(crate) fn lenient<'de, D>(deserializer: D) -> Result<JobStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(JobStatus::parse(&raw))
}
