use actix_web::{get, web, HttpResponse, Responder};
use log::error;
use serde_json::json;

use crate::store::PgMarketStore;

#[get("/health")]
pub async fn health(store: web::Data<PgMarketStore>) -> impl Responder {
    match store.question_count().await {
        Ok(count) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "storage": "postgresql",
            "questionCount": count
        })),
        Err(e) => {
            error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "storage": "postgresql",
                "error": e.to_string()
            }))
        }
    }
}
