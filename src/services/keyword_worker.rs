use std::{sync::Arc, time::Duration};

use tokio::sync::RwLock;

use crate::{
    domain::{
        job::Job,
        place::{PlaceRow, PlaceRules},
    },
    error::LookupError,
};

use super::{EmailFinder, LookupClient, Throttle};

/// Collaborators shared by every worker of one job.
pub struct WorkerContext {
    pub lookup: Arc<dyn LookupClient>,
    pub email_finder: Arc<dyn EmailFinder>,
    pub rules: Arc<PlaceRules>,
    pub throttle: Throttle,
    pub enrichment_timeout: Duration,
    pub enrichment_delay: Duration,
}

pub struct KeywordTask {
    pub keyword: String,
    pub city: String,
    pub max_results: usize,
    pub enrich_emails: bool,
}

/// Write access to a single keyword's status slot.
pub struct KeywordReporter {
    job: Arc<RwLock<Job>>,
    keyword: String,
}

impl KeywordReporter {
    pub fn new(job: Arc<RwLock<Job>>, keyword: String) -> Self {
        KeywordReporter { job, keyword }
    }

    pub async fn running(&self, message: &str) {
        self.job.write().await.keyword_running(&self.keyword, message);
    }

    pub async fn note(&self, count: usize, message: &str) {
        self.job
            .write()
            .await
            .keyword_note(&self.keyword, count, message);
    }
}

pub async fn run_keyword(
    ctx: &WorkerContext,
    reporter: &KeywordReporter,
    task: &KeywordTask,
) -> Result<Vec<PlaceRow>, LookupError> {
    reporter.running("Querying...").await;
    log::info!("Querying {} in {}", task.keyword, task.city);

    ctx.throttle.wait().await;
    let elements = ctx
        .lookup
        .lookup(&task.keyword, &task.city, task.max_results)
        .await?;

    let mut rows: Vec<PlaceRow> = elements
        .iter()
        .take(task.max_results)
        .filter_map(|el| ctx.rules.shape(el))
        .collect();
    reporter
        .note(rows.len(), &format!("Shaped {} places", rows.len()))
        .await;

    if task.enrich_emails {
        enrich_rows(ctx, reporter, &mut rows).await;
    }

    for row in rows.iter_mut() {
        row.keyword = task.keyword.clone();
    }

    reporter
        .note(rows.len(), &format!("Found {}", rows.len()))
        .await;
    log::info!("Found {} places for {}", rows.len(), task.keyword);

    Ok(rows)
}

async fn enrich_rows(ctx: &WorkerContext, reporter: &KeywordReporter, rows: &mut [PlaceRow]) {
    let total = rows.len();
    let pending = rows.iter().filter(|r| r.needs_email()).count();
    let mut visited = 0;

    for row in rows.iter_mut() {
        let website = match (&row.email, &row.website) {
            (None, Some(website)) => website.clone(),
            _ => continue,
        };

        if visited > 0 {
            tokio::time::sleep(ctx.enrichment_delay).await;
        }
        visited += 1;

        reporter
            .note(total, &format!("Looking up emails {}/{}", visited, pending))
            .await;

        row.email = ctx
            .email_finder
            .find_email(&website, ctx.enrichment_timeout)
            .await;
        if row.email.is_none() {
            log::debug!("No email found on {}", website);
        }
    }
}
