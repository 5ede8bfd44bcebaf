//! Siteforge client engine: HTTP API client, job polling, and artifact
//! lifecycle reconciliation.
mod api;
mod client;
mod handle;
mod poller;
mod preview;
mod repository;

pub use api::{PreviewAck, ProjectFiles, StatusPayload, SubmitAck, SubmitRequest, WireJobError};
pub use client::{ApiClient, ApiError, ClientSettings, HttpApiClient};
pub use handle::{ForgeHandle, SubmissionError};
pub use poller::{JobEvent, JobPoller, DEFAULT_POLL_INTERVAL};
pub use preview::{PreviewError, PreviewSession, PreviewSessionManager};
pub use repository::{DeleteError, ProjectRepository};
