use std::{collections::HashMap, path::PathBuf};

use itertools::Itertools;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordState {
    Queued,
    Running,
    Done,
    Failed,
}

impl KeywordState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, KeywordState::Done | KeywordState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordStatus {
    pub count: usize,
    pub state: KeywordState,
    pub message: String,
}

impl Default for KeywordStatus {
    fn default() -> Self {
        KeywordStatus {
            count: 0,
            state: KeywordState::Queued,
            message: "Queued".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactHandle {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

impl ArtifactHandle {
    pub fn download_path(&self) -> String {
        format!("/download/{}", self.file_name)
    }
}

/// A validated batch submission.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub keywords: Vec<String>,
    pub city: String,
    pub max_results: usize,
    pub enrich_emails: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordSnapshot {
    pub keyword: String,
    #[serde(flatten)]
    pub status: KeywordStatus,
}

/// Point-in-time copy of a job handed to pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub city: String,
    pub state: JobState,
    pub total: usize,
    pub completed: usize,
    pub keywords: Vec<KeywordSnapshot>,
    pub artifact: Option<ArtifactHandle>,
    /// Rows in the artifact after dedupe; absent until finished.
    pub row_count: Option<usize>,
    pub error: Option<String>,
}

/// Mutable job record. Fields are private so that `completed` can only grow
/// and the job can only finish once every keyword is terminal.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    city: String,
    state: JobState,
    keywords: Vec<String>,
    completed: usize,
    statuses: HashMap<String, KeywordStatus>,
    artifact: Option<ArtifactHandle>,
    row_count: Option<usize>,
    error: Option<String>,
}

impl Job {
    /// Keywords are normalized here so every keyword owns exactly one status slot.
    pub fn new(id: Uuid, city: &str, keywords: Vec<String>) -> Self {
        let keywords = normalize_keywords(keywords);
        let statuses = keywords
            .iter()
            .map(|k| (k.clone(), KeywordStatus::default()))
            .collect();

        Job {
            id,
            city: city.to_string(),
            state: JobState::Queued,
            keywords,
            completed: 0,
            statuses,
            artifact: None,
            row_count: None,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn total(&self) -> usize {
        self.keywords.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn keyword_status(&self, keyword: &str) -> Option<&KeywordStatus> {
        self.statuses.get(keyword)
    }

    pub fn all_keywords_terminal(&self) -> bool {
        self.statuses.values().all(|s| s.state.is_terminal())
    }

    pub fn start(&mut self) {
        if self.state == JobState::Queued {
            self.state = JobState::Running;
        }
    }

    pub fn keyword_running(&mut self, keyword: &str, message: &str) {
        if let Some(status) = self.statuses.get_mut(keyword) {
            status.state = KeywordState::Running;
            status.message = message.to_string();
        }
    }

    pub fn keyword_note(&mut self, keyword: &str, count: usize, message: &str) {
        if let Some(status) = self.statuses.get_mut(keyword) {
            status.count = count;
            status.message = message.to_string();
        }
    }

    /// Moves the keyword to a terminal state and bumps `completed` once.
    /// Returns `false` when the keyword is unknown or was already terminal.
    pub fn complete_keyword(&mut self, keyword: &str, outcome: Result<usize, String>) -> bool {
        let Some(status) = self.statuses.get_mut(keyword) else {
            return false;
        };
        if status.state.is_terminal() {
            return false;
        }

        match outcome {
            Ok(count) => {
                status.state = KeywordState::Done;
                status.count = count;
                status.message = format!("Found {}", count);
            }
            Err(message) => {
                status.state = KeywordState::Failed;
                status.count = 0;
                status.message = message;
            }
        }

        self.completed = (self.completed + 1).min(self.keywords.len());
        true
    }

    /// Only succeeds while running and after every keyword reached a terminal state.
    pub fn finish(&mut self, artifact: ArtifactHandle, row_count: usize) -> bool {
        if self.state != JobState::Running || !self.all_keywords_terminal() {
            return false;
        }
        self.state = JobState::Finished;
        self.artifact = Some(artifact);
        self.row_count = Some(row_count);
        true
    }

    pub fn fail(&mut self, error: String) {
        self.state = JobState::Failed;
        self.error = Some(error);
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            city: self.city.clone(),
            state: self.state,
            total: self.total(),
            completed: self.completed,
            keywords: self
                .keywords
                .iter()
                .map(|k| KeywordSnapshot {
                    keyword: k.clone(),
                    status: self.statuses.get(k).cloned().unwrap_or_default(),
                })
                .collect(),
            artifact: self.artifact.clone(),
            row_count: self.row_count,
            error: self.error.clone(),
        }
    }
}

/// Trims keywords, drops blanks and removes case-insensitive repeats,
/// keeping the first spelling in submission order.
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_string())
        .filter(|k| !k.is_empty())
        .unique_by(|k| k.to_lowercase())
        .collect()
}
