use actix_web::{get, HttpResponse, Responder};

#[get("/")]
pub async fn default() -> impl Responder {
    HttpResponse::Ok().body("leadmap is up. POST /create_job to start a batch.")
}
