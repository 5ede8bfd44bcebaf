use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Duration;

use client_logging::{client_info, client_warn};
use siteforge_core::{GenerationJob, JobStatus, ProjectId};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::repository::ProjectRepository;

/// Default delay between a poll's completion and the next poll's start.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Progress notification emitted by the polling loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Progress(GenerationJob),
    Finished {
        project_id: ProjectId,
        status: JobStatus,
    },
}

struct TrackedJob {
    generation: u64,
    token: CancellationToken,
}

/// Runs one polling loop per tracked job until a terminal snapshot lands.
///
/// Each loop is strictly sequential: the next poll is scheduled only after
/// the previous one resolves, so a slow network naturally throttles load
/// and at most one request per job is ever outstanding. Stopping is a
/// cancellation-token flip checked before every iteration; no timer can
/// fire after teardown.
pub struct JobPoller {
    client: Arc<dyn ApiClient>,
    repository: Arc<ProjectRepository>,
    interval: Duration,
    tracked: Arc<Mutex<HashMap<ProjectId, TrackedJob>>>,
    next_generation: AtomicU64,
    event_tx: mpsc::Sender<JobEvent>,
    event_rx: mpsc::Receiver<JobEvent>,
}

impl JobPoller {
    pub fn new(client: Arc<dyn ApiClient>, repository: Arc<ProjectRepository>) -> Self {
        Self::with_interval(client, repository, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(
        client: Arc<dyn ApiClient>,
        repository: Arc<ProjectRepository>,
        interval: Duration,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            client,
            repository,
            interval,
            tracked: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
            event_tx,
            event_rx,
        }
    }

    /// Begins polling `job` until it reaches a terminal status.
    ///
    /// Tracking an id that is already tracked supersedes the older loop.
    /// Must be called from within a tokio runtime.
    pub fn track(&self, mut job: GenerationJob) {
        let token = CancellationToken::new();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let project_id = job.id().to_string();
        {
            let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = tracked.insert(
                project_id.clone(),
                TrackedJob {
                    generation,
                    token: token.clone(),
                },
            ) {
                previous.token.cancel();
            }
        }

        let client = Arc::clone(&self.client);
        let repository = Arc::clone(&self.repository);
        let tracked = Arc::clone(&self.tracked);
        let event_tx = self.event_tx.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    return;
                }
                match client.job_status(&project_id).await {
                    Ok(snapshot) => {
                        if job.apply_snapshot(snapshot) {
                            repository.apply_job_snapshot(&job);
                            let _ = event_tx.send(JobEvent::Progress(job.clone()));
                        }
                        if job.is_finished() {
                            client_info!(
                                "job {} reached terminal status {}",
                                project_id,
                                job.status()
                            );
                            // One-time reconciliation so the finished
                            // project shows server-canonical metadata.
                            if let Err(err) = repository.refresh().await {
                                client_warn!(
                                    "post-completion refresh failed for {}: {}",
                                    project_id,
                                    err
                                );
                            }
                            let _ = event_tx.send(JobEvent::Finished {
                                project_id: project_id.clone(),
                                status: job.status(),
                            });
                            break;
                        }
                    }
                    Err(err) => {
                        // Transient by policy: keep the last known state
                        // and retry after the same interval.
                        client_warn!("poll failed for {}: {}; retrying", project_id, err);
                    }
                }
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            // Natural exit: clear the table entry unless a newer loop for
            // the same id has taken it over.
            let mut tracked = tracked.lock().unwrap_or_else(PoisonError::into_inner);
            if tracked
                .get(&project_id)
                .is_some_and(|entry| entry.generation == generation)
            {
                tracked.remove(&project_id);
            }
        });
    }

    /// Halts future polls for `id`. State already recorded is untouched
    /// and no cancellation reaches the server; generation continues there.
    pub fn stop(&self, id: &str) {
        let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = tracked.remove(id) {
            entry.token.cancel();
        }
    }

    pub fn is_tracking(&self, id: &str) -> bool {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Drains one pending event without blocking.
    pub fn try_recv(&self) -> Option<JobEvent> {
        self.event_rx.try_recv().ok()
    }
}
