use std::time::Duration;

use log::{info, warn};
use market_aggregator::MarketAggregator;
use tokio::task::JoinHandle;

/// Rebuilds the market cache from chain on a fixed interval. Failed reads
/// from one pass are simply retried by the next.
pub fn start_refresh_worker(
    aggregator: MarketAggregator,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        info!("Periodic market refresh disabled");
        return None;
    }

    info!("Starting market refresh worker every {:?}", interval);
    Some(tokio::spawn(async move {
        loop {
            let markets = aggregator.refresh_and_store().await;
            if markets.is_empty() {
                warn!("Periodic refresh found no readable markets");
            } else {
                info!("Periodic refresh cached {} markets", markets.len());
            }
            tokio::time::sleep(interval).await;
        }
    }))
}
