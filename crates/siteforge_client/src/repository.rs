use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use siteforge_core::{GenerationJob, ProjectId, ProjectRecord};
use thiserror::Error;

use crate::client::{ApiClient, ApiError};

#[derive(Debug, Error)]
pub enum DeleteError {
    /// A second delete was requested for an id whose delete is still in
    /// flight.
    #[error("a delete for project {0} is already in flight")]
    ConcurrentOperation(ProjectId),
    #[error("delete request failed: {0}")]
    Remote(#[from] ApiError),
}

/// In-memory mirror of the server's project collection; the single source
/// of truth for list views.
///
/// Mutation happens only through [`refresh`](Self::refresh),
/// [`apply_job_snapshot`](Self::apply_job_snapshot) and the success path
/// of [`delete`](Self::delete), always as whole-record or
/// whole-collection replacement. Locks are never held across an await.
pub struct ProjectRepository {
    client: Arc<dyn ApiClient>,
    cache: RwLock<Vec<ProjectRecord>>,
    deletes_in_flight: Mutex<HashSet<ProjectId>>,
}

impl ProjectRepository {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            cache: RwLock::new(Vec::new()),
            deletes_in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Current cache contents; never touches the network.
    pub fn list(&self) -> Vec<ProjectRecord> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Synchronous single-record lookup.
    pub fn find(&self, id: &str) -> Option<ProjectRecord> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Fetches the gallery listing and replaces the cache wholesale.
    ///
    /// The server is authoritative and the collection is small; full
    /// reconciliation sidesteps merge races with concurrent deletions.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let records = self.client.gallery().await?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = records;
        Ok(())
    }

    /// Upserts the provisional record derived from `job` so progress shows
    /// immediately; the next [`refresh`](Self::refresh) overwrites it with
    /// the server-canonical view.
    pub fn apply_job_snapshot(&self, job: &GenerationJob) {
        let record = ProjectRecord::provisional(job);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        match cache.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => cache.push(record),
        }
    }

    /// Issues the remote delete and removes the record only on confirmed
    /// success. One delete per id at a time; a concurrent second call is
    /// rejected without touching the server.
    pub async fn delete(&self, id: &str) -> Result<(), DeleteError> {
        {
            let mut in_flight = self
                .deletes_in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !in_flight.insert(id.to_string()) {
                return Err(DeleteError::ConcurrentOperation(id.to_string()));
            }
        }

        let result = self.client.delete_project(id).await;

        self.deletes_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        result?;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.retain(|record| record.id != id);
        Ok(())
    }
}
