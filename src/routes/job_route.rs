use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    domain::job::{JobSnapshot, JobState, KeywordSnapshot},
    services::{JobService, JobStatus, SubmitJob},
};

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordsInput {
    List(Vec<String>),
    Text(String),
}

impl KeywordsInput {
    /// Free text accepts comma or newline separated keywords.
    fn into_vec(self) -> Vec<String> {
        match self {
            KeywordsInput::List(keywords) => keywords,
            KeywordsInput::Text(text) => text
                .split([',', '\n'])
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct CreateJobBody {
    #[serde(alias = "keyword")]
    keywords: KeywordsInput,
    city: String,
    max_results: Option<usize>,
    #[serde(default)]
    enrich_emails: bool,
    #[serde(default)]
    agree: Value,
}

fn agreed(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}

#[post("/create_job")]
pub async fn create_job(
    job_service: web::Data<JobService>,
    body: web::Json<CreateJobBody>,
) -> HttpResponse {
    let body = body.into_inner();

    if !agreed(&body.agree) {
        return HttpResponse::BadRequest().json(json!({"error": "You must agree to the terms"}));
    }

    let submission = SubmitJob {
        keywords: body.keywords.into_vec(),
        city: body.city,
        max_results: body.max_results,
        enrich_emails: body.enrich_emails,
    };

    match job_service.submit(submission).await {
        Ok(job_id) => HttpResponse::Ok().json(json!({ "job_id": job_id })),
        Err(e) => HttpResponse::BadRequest().json(json!({"error": e.to_string()})),
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: JobState,
    total: usize,
    completed: usize,
    count: usize,
    keywords: Vec<KeywordSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<JobSnapshot> for StatusResponse {
    /// `count` is the artifact's row count once finished, the running sum of
    /// per-keyword counts before that.
    fn from(value: JobSnapshot) -> Self {
        let count = value
            .row_count
            .unwrap_or_else(|| value.keywords.iter().map(|k| k.status.count).sum());

        Self {
            status: value.state,
            total: value.total,
            completed: value.completed,
            count,
            keywords: value.keywords,
            download: value.artifact.map(|a| a.download_path()),
            error: value.error,
        }
    }
}

#[get("/status/{job_id}")]
pub async fn job_status(
    job_service: web::Data<JobService>,
    path: web::Path<String>,
) -> HttpResponse {
    let not_found = || HttpResponse::Ok().json(json!({"status": "not-found"}));

    let Ok(job_id) = Uuid::parse_str(&path.into_inner()) else {
        return not_found();
    };

    match job_service.get_status(&job_id).await {
        JobStatus::NotFound => not_found(),
        JobStatus::Found(snapshot) => HttpResponse::Ok().json(StatusResponse::from(snapshot)),
    }
}
