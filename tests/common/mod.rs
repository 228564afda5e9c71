#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use leadmap::{
    domain::{
        job::{ArtifactHandle, JobSnapshot, JobState},
        place::{PlaceRow, RawElement},
    },
    error::{ArtifactWriteError, LookupError},
    services::{ArtifactWriter, EmailFinder, JobService, JobStatus, LookupClient},
};
use tokio::time::Instant;
use uuid::Uuid;

pub fn element(name: &str, category: &str, lat: f64, lon: f64) -> RawElement {
    let mut tags = HashMap::new();
    tags.insert("name".to_string(), name.to_string());
    tags.insert("office".to_string(), category.to_string());

    RawElement {
        lat: Some(lat),
        lon: Some(lon),
        center: None,
        tags,
    }
}

pub fn with_tag(mut element: RawElement, key: &str, value: &str) -> RawElement {
    element.tags.insert(key.to_string(), value.to_string());
    element
}

/// Lookup answering from a per-keyword script and tracking concurrency.
#[derive(Default)]
pub struct ScriptedLookup {
    responses: HashMap<String, Result<Vec<RawElement>, String>>,
    delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub called_at: Mutex<Vec<Instant>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn returns(mut self, keyword: &str, elements: Vec<RawElement>) -> Self {
        self.responses.insert(keyword.to_string(), Ok(elements));
        self
    }

    pub fn fails(mut self, keyword: &str, message: &str) -> Self {
        self.responses
            .insert(keyword.to_string(), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl LookupClient for ScriptedLookup {
    async fn lookup(
        &self,
        keyword: &str,
        _city: &str,
        _max_results: usize,
    ) -> Result<Vec<RawElement>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called_at.lock().unwrap().push(Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(keyword) {
            Some(Ok(elements)) => Ok(elements.clone()),
            Some(Err(message)) => Err(LookupError::Payload(message.clone())),
            None => Ok(vec![]),
        }
    }
}

/// Lookup that holds every call until the test opens the gate.
pub struct GatedLookup {
    pub gate: Arc<tokio::sync::Semaphore>,
}

#[async_trait]
impl LookupClient for GatedLookup {
    async fn lookup(
        &self,
        keyword: &str,
        _city: &str,
        _max_results: usize,
    ) -> Result<Vec<RawElement>, LookupError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| LookupError::Payload(e.to_string()))?;
        Ok(vec![element(keyword, "it", 1.0, 1.0)])
    }
}

#[derive(Default)]
pub struct RecordingEmailFinder {
    pub visited: Mutex<Vec<String>>,
    pub visited_at: Mutex<Vec<Instant>>,
}

#[async_trait]
impl EmailFinder for RecordingEmailFinder {
    async fn find_email(&self, website: &str, _timeout: Duration) -> Option<String> {
        self.visited.lock().unwrap().push(website.to_string());
        self.visited_at.lock().unwrap().push(Instant::now());
        match website.contains("nomail") {
            true => None,
            false => Some(format!("info@{}", website)),
        }
    }
}

#[derive(Default)]
pub struct RecordingWriter {
    pub rows: Mutex<Vec<PlaceRow>>,
}

#[async_trait]
impl ArtifactWriter for RecordingWriter {
    async fn write(
        &self,
        job_id: Uuid,
        rows: &[PlaceRow],
    ) -> Result<ArtifactHandle, ArtifactWriteError> {
        *self.rows.lock().unwrap() = rows.to_vec();
        Ok(ArtifactHandle {
            file_name: format!("{}.csv", job_id),
            path: PathBuf::from(format!("memory/{}.csv", job_id)),
        })
    }
}

pub struct FailingWriter;

#[async_trait]
impl ArtifactWriter for FailingWriter {
    async fn write(
        &self,
        _job_id: Uuid,
        _rows: &[PlaceRow],
    ) -> Result<ArtifactHandle, ArtifactWriteError> {
        Err(ArtifactWriteError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only output directory",
        )))
    }
}

pub struct PanickingWriter;

#[async_trait]
impl ArtifactWriter for PanickingWriter {
    async fn write(
        &self,
        _job_id: Uuid,
        _rows: &[PlaceRow],
    ) -> Result<ArtifactHandle, ArtifactWriteError> {
        panic!("writer exploded");
    }
}

/// Gaps between consecutive instants.
pub fn gaps(instants: &[Instant]) -> Vec<Duration> {
    instants.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Polls until the job leaves `queued`/`running`.
pub async fn wait_for_terminal(service: &JobService, id: &Uuid) -> JobSnapshot {
    let poll = async {
        loop {
            if let JobStatus::Found(snapshot) = service.get_status(id).await {
                if matches!(snapshot.state, JobState::Finished | JobState::Failed) {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .expect("job did not reach a terminal state")
}
