use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ChainError;

/// Height reported before the first successful observation.
pub const BOOTSTRAP_HEIGHT: u64 = 14_000_000;

pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Longest a caller waits on the node before falling back.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Rough block time used for countdowns shown next to a market.
pub const DISPLAY_SECONDS_PER_BLOCK: u64 = 3;

/// Conservative block time used when picking a resolution height.
pub const SCHEDULING_SECONDS_PER_BLOCK: u64 = 5;

#[async_trait]
pub trait HeightSource: Send + Sync {
    async fn latest_height(&self) -> Result<u64, ChainError>;
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    height: u64,
    at: Instant,
}

/// Caches the chain height for a short TTL. Heights only feed human-readable
/// estimates, so a stale or bootstrap value is acceptable on failure.
pub struct BlockHeightTracker {
    source: Arc<dyn HeightSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    last: Mutex<Option<Observation>>,
}

impl BlockHeightTracker {
    pub fn new(source: Arc<dyn HeightSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            last: Mutex::new(None),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub async fn current_height(&self) -> u64 {
        // Held across the fetch so concurrent callers share one request.
        // Each fetch is bounded by `fetch_timeout`.
        let mut last = self.last.lock().await;

        if let Some(observed) = *last {
            if observed.at.elapsed() < self.ttl {
                return observed.height;
            }
        }

        let fallback = (*last).map(|o| o.height).unwrap_or(BOOTSTRAP_HEIGHT);
        match tokio::time::timeout(self.fetch_timeout, self.source.latest_height()).await {
            Ok(Ok(height)) => {
                *last = Some(Observation {
                    height,
                    at: Instant::now(),
                });
                height
            }
            Ok(Err(e)) => {
                warn!("Failed to fetch block height, using {}: {}", fallback, e);
                fallback
            }
            Err(_) => {
                warn!(
                    "Block height fetch timed out after {:?}, using {}",
                    self.fetch_timeout, fallback
                );
                fallback
            }
        }
    }
}

/// Countdown text such as `~2d 3h left` for a market resolving at
/// `resolution_height`.
pub fn estimate_time_remaining(resolution_height: u64, current_height: u64) -> String {
    if resolution_height <= current_height {
        return "Ended".to_string();
    }

    let seconds = (resolution_height - current_height) * DISPLAY_SECONDS_PER_BLOCK;
    let hours = seconds / 3600;
    let days = hours / 24;

    if days > 0 {
        format!("~{}d {}h left", days, hours % 24)
    } else if hours > 0 {
        format!("~{}h left", hours)
    } else {
        format!("~{}m left", seconds / 60)
    }
}

/// Resolution height for a market meant to close `days` from now.
pub fn resolution_height_after_days(current_height: u64, days: u64) -> u64 {
    let blocks_per_day = 24 * 60 * 60 / SCHEDULING_SECONDS_PER_BLOCK;
    current_height.saturating_add(days.saturating_mul(blocks_per_day))
}
