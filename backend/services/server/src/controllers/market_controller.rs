use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder};
use aleo_client::block_height::resolution_height_after_days;
use aleo_client::MarketId;
use chrono::Utc;
use log::{info, warn};
use market_aggregator::{MarketAggregator, MarketCache, MarketSnapshot, PendingMarket};
use serde_json::{json, Value};
use validator::Validate;

use crate::store::PgMarketStore;
use crate::types::market_types::{BlockHeightQuery, MarketsQuery, TrackPendingRequest};
use crate::utils::responses::{error_response, store_error_response, validation_message};

/// Raw cache read. Never fails; an unreadable cache reads as not cached.
#[get("/markets/cached")]
pub async fn get_cached_markets(store: web::Data<PgMarketStore>) -> impl Responder {
    match store.list().await {
        Ok(markets) => HttpResponse::Ok().json(json!({
            "markets": markets,
            "cached": true
        })),
        Err(e) => {
            warn!("Market cache read failed: {}", e);
            HttpResponse::Ok().json(json!({
                "markets": [],
                "cached": false
            }))
        }
    }
}

#[post("/markets/cache")]
pub async fn cache_markets(
    store: web::Data<PgMarketStore>,
    body: web::Json<Value>,
) -> impl Responder {
    let Some(raw) = body.get("markets").filter(|m| m.is_array()) else {
        return error_response(StatusCode::BAD_REQUEST, "markets array required");
    };

    let markets: Vec<MarketSnapshot> = match serde_json::from_value(raw.clone()) {
        Ok(markets) => markets,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid market entry: {}", e))
        }
    };

    match store.store(&markets).await {
        Ok(count) => {
            info!("Cached {} markets from client", count);
            HttpResponse::Ok().json(json!({
                "success": true,
                "count": count
            }))
        }
        Err(e) => store_error_response("Failed to cache markets", &e),
    }
}

#[get("/markets")]
pub async fn get_markets(
    aggregator: web::Data<MarketAggregator>,
    query: web::Query<MarketsQuery>,
) -> impl Responder {
    let markets = if query.refresh {
        aggregator.list_markets_fresh().await
    } else {
        aggregator.list_markets().await
    };

    HttpResponse::Ok().json(json!({
        "status": "success",
        "count": markets.len(),
        "markets": markets
    }))
}

#[get("/markets/{market_id}")]
pub async fn get_market(
    aggregator: web::Data<MarketAggregator>,
    path: web::Path<String>,
) -> impl Responder {
    let market_id = match MarketId::parse(&path.into_inner()) {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match aggregator.market_details(&market_id).await {
        Some(market) => {
            let time_remaining = market.time_remaining();
            HttpResponse::Ok().json(json!({
                "status": "success",
                "market": market,
                "timeRemaining": time_remaining
            }))
        }
        None => error_response(StatusCode::NOT_FOUND, "Market not found"),
    }
}

#[post("/markets/pending")]
pub async fn track_pending_market(
    aggregator: web::Data<MarketAggregator>,
    req: web::Json<TrackPendingRequest>,
) -> impl Responder {
    if let Err(e) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, validation_message(&e));
    }

    let req = req.into_inner();
    let market_id = match MarketId::parse(&req.market_id) {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let pending = PendingMarket {
        id: market_id.clone(),
        question: req.question,
        ipfs_cid: req.ipfs_cid,
        created_at: Utc::now(),
    };

    match aggregator.track_pending(pending) {
        Ok(tracked) => HttpResponse::Created().json(json!({
            "success": true,
            "marketId": market_id,
            "tracked": tracked
        })),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Current height, plus the resolution height for a market closing `days`
/// from now when asked.
#[get("/block-height")]
pub async fn get_block_height(
    aggregator: web::Data<MarketAggregator>,
    query: web::Query<BlockHeightQuery>,
) -> impl Responder {
    let height = aggregator.heights().current_height().await;

    match query.days {
        Some(days) => HttpResponse::Ok().json(json!({
            "height": height,
            "days": days,
            "resolutionHeight": resolution_height_after_days(height, days)
        })),
        None => HttpResponse::Ok().json(json!({ "height": height })),
    }
}
