use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{sync::Semaphore, task::JoinSet};

use crate::domain::{
    job::JobRequest,
    place::{dedupe, PlaceRow, PlaceRules},
};

use super::{
    run_keyword, ArtifactWriter, EmailFinder, KeywordReporter, KeywordTask, LookupClient,
    SharedJob, Throttle, WorkerContext,
};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub concurrency: usize,
    pub politeness_delay: Duration,
    pub enrichment_timeout: Duration,
    pub enrichment_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        OrchestratorSettings {
            concurrency: 5,
            politeness_delay: Duration::from_secs(1),
            enrichment_timeout: Duration::from_secs(10),
            enrichment_delay: Duration::from_millis(500),
        }
    }
}

pub struct JobOrchestrator {
    lookup: Arc<dyn LookupClient>,
    email_finder: Arc<dyn EmailFinder>,
    artifact_writer: Arc<dyn ArtifactWriter>,
    rules: Arc<PlaceRules>,
    settings: OrchestratorSettings,
}

type KeywordOutcome = (String, Result<Vec<PlaceRow>, String>);

impl JobOrchestrator {
    pub fn new(
        lookup: Arc<dyn LookupClient>,
        email_finder: Arc<dyn EmailFinder>,
        artifact_writer: Arc<dyn ArtifactWriter>,
        rules: Arc<PlaceRules>,
        settings: OrchestratorSettings,
    ) -> Self {
        JobOrchestrator {
            lookup,
            email_finder,
            artifact_writer,
            rules,
            settings,
        }
    }

    /// Runs every keyword of the job and writes the merged artifact.
    /// Always leaves the job `finished` or `failed`.
    pub async fn run(&self, job: SharedJob, request: JobRequest) {
        let (job_id, keywords) = {
            let mut job = job.write().await;
            job.start();
            (job.id(), job.keywords().to_vec())
        };
        log::info!(
            "Started job {} with {} keywords in {}",
            job_id,
            keywords.len(),
            request.city
        );

        let rows = self.fan_out(&job, &keywords, &request).await;
        let rows = dedupe(rows);

        match self.artifact_writer.write(job_id, &rows).await {
            Ok(artifact) => {
                let mut job = job.write().await;
                if job.finish(artifact, rows.len()) {
                    log::info!("Finished job {} with {} rows", job_id, rows.len());
                } else {
                    log::error!("Job {} still had open keywords after fan-in", job_id);
                    job.fail("Job ended with unfinished keywords".to_string());
                }
            }
            Err(e) => {
                log::error!("Failed to write artifact for job {}: {}", job_id, e);
                job.write().await.fail(e.to_string());
            }
        }
    }

    /// Spawns one worker per keyword, at most `concurrency` running at once,
    /// and folds their results in completion order. `keywords` comes from the
    /// job itself so each worker maps onto an existing status slot.
    async fn fan_out(
        &self,
        job: &SharedJob,
        keywords: &[String],
        request: &JobRequest,
    ) -> Vec<PlaceRow> {
        let ctx = Arc::new(WorkerContext {
            lookup: self.lookup.clone(),
            email_finder: self.email_finder.clone(),
            rules: self.rules.clone(),
            throttle: Throttle::new(self.settings.politeness_delay),
            enrichment_timeout: self.settings.enrichment_timeout,
            enrichment_delay: self.settings.enrichment_delay,
        });
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));

        let mut workers: JoinSet<KeywordOutcome> = JoinSet::new();
        let mut task_keywords = HashMap::new();

        for keyword in keywords {
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            let reporter = KeywordReporter::new(job.clone(), keyword.clone());
            let task = KeywordTask {
                keyword: keyword.clone(),
                city: request.city.clone(),
                max_results: request.max_results,
                enrich_emails: request.enrich_emails,
            };

            let handle = workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (task.keyword, Err("Worker pool closed".to_string()));
                };

                let result = run_keyword(&ctx, &reporter, &task)
                    .await
                    .map_err(|e| e.to_string());
                (task.keyword, result)
            });
            task_keywords.insert(handle.id(), keyword.clone());
        }

        let mut rows = Vec::new();

        while let Some(joined) = workers.join_next().await {
            let (keyword, outcome) = match joined {
                Ok((keyword, Ok(found))) => {
                    let count = found.len();
                    rows.extend(found);
                    (keyword, Ok(count))
                }
                Ok((keyword, Err(message))) => {
                    log::error!("Keyword {} failed: {}", keyword, message);
                    (keyword, Err(message))
                }
                Err(e) => {
                    let Some(keyword) = task_keywords.get(&e.id()).cloned() else {
                        log::error!("Lost track of a keyword worker: {}", e);
                        continue;
                    };
                    log::error!("Keyword {} worker crashed: {}", keyword, e);
                    (keyword, Err(format!("Worker crashed: {}", e)))
                }
            };

            let mut job = job.write().await;
            job.complete_keyword(&keyword, outcome);
            log::info!(
                "Job {} progress {}/{}",
                job.id(),
                job.completed(),
                job.total()
            );
        }

        rows
    }
}
