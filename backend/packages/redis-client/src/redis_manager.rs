use std::time::Duration;

use fred::error::RedisErrorKind;
use fred::prelude::*;
use fred::types::Expiration;
use log::{info, warn};

/// Thin wrapper over a fred client. Constructed once in `main` and handed
/// to whoever needs it; there is no process-wide instance.
#[derive(Clone)]
pub struct RedisManager {
    client: RedisClient,
}

impl RedisManager {
    pub fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;
        let client = RedisClient::new(config, None, None, None);

        Ok(Self { client })
    }

    pub async fn connect(&self, timeout: Duration) -> Result<(), RedisError> {
        self.client.connect();
        match tokio::time::timeout(timeout, self.client.wait_for_connect()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RedisError::new(
                    RedisErrorKind::Timeout,
                    "timed out waiting for Redis connection",
                ));
            }
        }
        info!("Connected to Redis");
        Ok(())
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.quit().await {
            warn!("Error while closing Redis connection: {}", e);
        }
    }

    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        seconds: i64,
    ) -> Result<(), RedisError> {
        self.client
            .set::<(), _, _>(key, value, Some(Expiration::EX(seconds)), None, false)
            .await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    pub async fn delete(&self, key: &str) -> Result<(), RedisError> {
        self.client.del::<(), _>(key).await
    }
}
