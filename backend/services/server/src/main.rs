mod config;
mod controllers;
mod models;
mod services;
mod store;
mod types;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use aleo_client::{AleoRpcClient, BlockHeightTracker};
use dotenvy::dotenv;
use log::{info, warn};
use market_aggregator::{LocalPendingTracker, MarketAggregator};
use redis_client::RedisManager;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::controllers::health_controller::health;
use crate::controllers::index_controller::{get_all_questions, get_question, index_question};
use crate::controllers::market_controller::{
    cache_markets, get_block_height, get_cached_markets, get_market, get_markets,
    track_pending_market,
};
use crate::services::question_cache::QuestionCache;
use crate::services::refresh_worker::start_refresh_worker;
use crate::store::PgMarketStore;
use crate::utils::responses::json_error_handler;

async fn connect_redis(redis_url: &str) -> Option<RedisManager> {
    let redis_manager = match RedisManager::new(redis_url) {
        Ok(manager) => manager,
        Err(e) => {
            warn!("Invalid REDIS_URL, question cache disabled: {}", e);
            return None;
        }
    };

    match redis_manager.connect(Duration::from_secs(5)).await {
        Ok(()) => Some(redis_manager),
        Err(e) => {
            warn!("Redis unavailable, question cache disabled: {}", e);
            None
        }
    }
}

async fn run() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    let store = PgMarketStore::new(pool);
    store.migrate().await.expect("Failed to run migrations");
    info!("Connected to Postgres");

    let redis_manager = connect_redis(&config.redis_url).await;
    let question_cache = QuestionCache::new(redis_manager.clone(), config.questions_cache_ttl_secs);

    let chain = Arc::new(
        AleoRpcClient::new(config.aleo.clone()).expect("Failed to build Aleo RPC client"),
    );
    let heights = Arc::new(BlockHeightTracker::new(chain.clone(), config.block_height_ttl));
    let shared_store = Arc::new(store.clone());
    let aggregator = MarketAggregator::new(
        chain,
        heights,
        shared_store.clone(),
        shared_store,
        LocalPendingTracker::new(),
    )
    .with_max_markets(config.max_markets);

    info!(
        "Reading markets from {} on {} via {}",
        config.aleo.program_id, config.aleo.network, config.aleo.rpc_url
    );
    let refresh_worker = start_refresh_worker(aggregator.clone(), config.refresh_interval);

    let store_data = web::Data::new(store.clone());
    let aggregator_data = web::Data::new(aggregator);
    let question_cache_data = web::Data::new(question_cache);

    info!("Listening on {}", config.bind_addr);
    let result = HttpServer::new(move || {
        let api_scope = web::scope("/api")
            .service(health)
            .service(index_question)
            .service(get_question)
            .service(get_all_questions)
            .service(get_cached_markets)
            .service(cache_markets)
            .service(track_pending_market)
            .service(get_block_height)
            .service(get_markets)
            .service(get_market);

        App::new()
            .app_data(store_data.clone())
            .app_data(aggregator_data.clone())
            .app_data(question_cache_data.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(api_scope)
    })
    .bind(&config.bind_addr)?
    .run()
    .await;

    if let Some(worker) = refresh_worker {
        worker.abort();
    }
    if let Some(redis_manager) = redis_manager {
        redis_manager.disconnect().await;
    }
    store.pool().close().await;
    info!("Shut down cleanly");

    result
}

fn main() -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");
    runtime.block_on(run())
}
