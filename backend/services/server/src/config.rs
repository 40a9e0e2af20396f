use std::env;
use std::str::FromStr;
use std::time::Duration;

use aleo_client::config::{
    DEFAULT_NETWORK, DEFAULT_PROGRAM_ID, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RPC_URL,
};
use aleo_client::registry::DEFAULT_MAX_MARKETS;
use aleo_client::AleoConfig;
use log::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,
    pub aleo: AleoConfig,
    pub bind_addr: String,
    /// Zero disables the periodic refresh.
    pub refresh_interval: Duration,
    pub block_height_ttl: Duration,
    pub questions_cache_ttl_secs: i64,
    pub max_markets: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env");

        Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 5),
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1:6379"),
            aleo: AleoConfig::new(
                env_or("ALEO_RPC_URL", DEFAULT_RPC_URL),
                env_or("ALEO_NETWORK", DEFAULT_NETWORK),
                env_or("ALEO_PROGRAM_ID", DEFAULT_PROGRAM_ID),
            )
            .with_request_timeout(Duration::from_secs(env_parse(
                "ALEO_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            ))),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3001"),
            refresh_interval: Duration::from_secs(env_parse("REFRESH_INTERVAL_SECS", 60)),
            block_height_ttl: Duration::from_secs(env_parse("BLOCK_HEIGHT_TTL_SECS", 10)),
            questions_cache_ttl_secs: env_parse("QUESTIONS_CACHE_TTL_SECS", 300),
            max_markets: env_parse("MAX_MARKETS", DEFAULT_MAX_MARKETS),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value for {}: {}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
