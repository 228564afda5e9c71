use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::job::{normalize_keywords, Job, JobRequest, JobSnapshot},
    error::ValidationError,
};

use super::{JobOrchestrator, JobRegistry};

#[derive(Debug, Clone, Default)]
pub struct SubmitJob {
    pub keywords: Vec<String>,
    pub city: String,
    pub max_results: Option<usize>,
    pub enrich_emails: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    NotFound,
    Found(JobSnapshot),
}

/// Entry point used by the HTTP layer: accepts batches and answers polls.
pub struct JobService {
    registry: Arc<JobRegistry>,
    orchestrator: Arc<JobOrchestrator>,
    default_max_results: usize,
}

impl JobService {
    pub fn new(
        registry: Arc<JobRegistry>,
        orchestrator: Arc<JobOrchestrator>,
        default_max_results: usize,
    ) -> Self {
        JobService {
            registry,
            orchestrator,
            default_max_results,
        }
    }

    pub fn validate(&self, submission: SubmitJob) -> Result<JobRequest, ValidationError> {
        let keywords = normalize_keywords(&submission.keywords);
        if keywords.is_empty() {
            return Err(ValidationError::NoKeywords);
        }

        let city = submission.city.trim();
        if city.is_empty() {
            return Err(ValidationError::BlankCity);
        }

        let max_results = submission.max_results.unwrap_or(self.default_max_results);
        if max_results == 0 {
            return Err(ValidationError::InvalidMaxResults);
        }

        Ok(JobRequest {
            keywords,
            city: city.to_string(),
            max_results,
            enrich_emails: submission.enrich_emails,
        })
    }

    /// Registers the job and starts it in the background. Returns immediately.
    pub async fn submit(&self, submission: SubmitJob) -> Result<Uuid, ValidationError> {
        let request = self.validate(submission)?;

        let id = Uuid::new_v4();
        let job = self
            .registry
            .create(Job::new(id, &request.city, request.keywords.clone()))
            .await;
        log::info!(
            "Submitted job {} with {} keywords",
            id,
            request.keywords.len()
        );

        let orchestrator = self.orchestrator.clone();
        let handle = tokio::spawn({
            let job = job.clone();
            async move { orchestrator.run(job, request).await }
        });

        // A panic past the worker pool (e.g. in the artifact writer) must still
        // leave the job terminal.
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                log::error!("Job {} crashed: {}", id, e);
                job.write().await.fail(format!("Job crashed: {}", e));
            }
        });

        Ok(id)
    }

    pub async fn get_status(&self, id: &Uuid) -> JobStatus {
        match self.registry.snapshot(id).await {
            Some(snapshot) => JobStatus::Found(snapshot),
            None => JobStatus::NotFound,
        }
    }
}
