use log::warn;
use market_aggregator::QuestionMeta;
use redis_client::RedisManager;

const QUESTIONS_KEY: &str = "questions:all";

/// Redis copy of the question listing. Every failure degrades to a miss;
/// with no Redis connection the cache is simply off.
#[derive(Clone)]
pub struct QuestionCache {
    redis: Option<RedisManager>,
    ttl_secs: i64,
}

impl QuestionCache {
    pub fn new(redis: Option<RedisManager>, ttl_secs: i64) -> Self {
        Self { redis, ttl_secs }
    }

    pub fn disabled() -> Self {
        Self::new(None, 0)
    }

    pub async fn get_all(&self) -> Option<Vec<QuestionMeta>> {
        let redis_manager = self.redis.as_ref()?;

        match redis_manager.get(QUESTIONS_KEY).await {
            Ok(Some(cached)) => match serde_json::from_str::<Vec<QuestionMeta>>(&cached) {
                Ok(questions) => Some(questions),
                Err(e) => {
                    warn!("Discarding unreadable {} entry: {}", QUESTIONS_KEY, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Redis cache read error: {:?}", e);
                None
            }
        }
    }

    pub async fn put_all(&self, questions: &[QuestionMeta]) {
        let Some(redis_manager) = self.redis.as_ref() else {
            return;
        };

        match serde_json::to_string(questions) {
            Ok(json) => {
                if let Err(e) = redis_manager.set_with_ttl(QUESTIONS_KEY, &json, self.ttl_secs).await {
                    warn!("Failed to cache questions: {:?}", e);
                }
            }
            Err(e) => warn!("Failed to serialize questions for cache: {}", e),
        }
    }

    pub async fn invalidate(&self) {
        if let Some(redis_manager) = self.redis.as_ref() {
            if let Err(e) = redis_manager.delete(QUESTIONS_KEY).await {
                warn!("Failed to invalidate question cache: {:?}", e);
            }
        }
    }
}
