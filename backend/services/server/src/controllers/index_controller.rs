use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder};
use aleo_client::MarketId;
use log::{info, warn};
use market_aggregator::{OffChainIndex, QuestionMeta};
use serde_json::json;
use validator::Validate;

use crate::services::question_cache::QuestionCache;
use crate::store::PgMarketStore;
use crate::types::index_types::IndexQuestionRequest;
use crate::utils::responses::{error_response, store_error_response, validation_message};

#[post("/index")]
pub async fn index_question(
    store: web::Data<PgMarketStore>,
    question_cache: web::Data<QuestionCache>,
    req: web::Json<IndexQuestionRequest>,
) -> impl Responder {
    if let Err(e) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, validation_message(&e));
    }

    let req = req.into_inner();
    let market_id = match MarketId::parse(&req.market_id) {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let meta = QuestionMeta {
        market_id: market_id.clone(),
        question: req.question,
        hash: req.hash,
        ipfs_cid: req.ipfs_cid,
        created_at: None,
    };

    if let Err(e) = store.upsert(meta).await {
        return store_error_response("Failed to index question", &e);
    }
    question_cache.invalidate().await;

    info!("Indexed question for market {}", market_id);
    HttpResponse::Ok().json(json!({
        "success": true,
        "marketId": market_id
    }))
}

#[get("/question/{market_id}")]
pub async fn get_question(
    store: web::Data<PgMarketStore>,
    path: web::Path<String>,
) -> impl Responder {
    let market_id = match MarketId::parse(&path.into_inner()) {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match store.get(&market_id).await {
        Ok(Some(meta)) => HttpResponse::Ok().json(meta),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Question not found"),
        Err(e) => store_error_response("Failed to fetch question", &e),
    }
}

#[get("/questions")]
pub async fn get_all_questions(
    store: web::Data<PgMarketStore>,
    question_cache: web::Data<QuestionCache>,
) -> impl Responder {
    if let Some(questions) = question_cache.get_all().await {
        return HttpResponse::Ok().json(questions);
    }

    match store.list_questions().await {
        Ok(questions) => {
            question_cache.put_all(&questions).await;
            HttpResponse::Ok().json(questions)
        }
        Err(e) => {
            warn!("Question listing unavailable: {}", e);
            store_error_response("Failed to fetch questions", &e)
        }
    }
}
