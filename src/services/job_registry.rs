use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::job::{Job, JobSnapshot};

pub type SharedJob = Arc<RwLock<Job>>;

/// Process-wide lookup from job id to job state.
///
/// Entries are never evicted; every job stays readable until the process exits.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, SharedJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, job: Job) -> SharedJob {
        let id = job.id();
        let shared = Arc::new(RwLock::new(job));
        self.jobs.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedJob> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn snapshot(&self, id: &Uuid) -> Option<JobSnapshot> {
        let job = self.get(id).await?;
        let snapshot = job.read().await.snapshot();
        Some(snapshot)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
