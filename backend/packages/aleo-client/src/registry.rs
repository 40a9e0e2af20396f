use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};

use crate::config::mappings;
use crate::mapping_reader::MappingSource;
use crate::struct_parser::{parse_field_literal, parse_u64_literal};
use crate::types::MarketId;

const COUNT_KEY: &str = "0u64";

/// Most indices resolved in one listing.
pub const DEFAULT_MAX_MARKETS: u64 = 10_000;

/// Discovers markets through the program's `market_count` scalar and the
/// `market_ids` index mapping. The chain has no range query, so listing
/// costs one read per index.
#[derive(Clone)]
pub struct MarketRegistry {
    source: Arc<dyn MappingSource>,
    max_markets: u64,
}

impl MarketRegistry {
    pub fn new(source: Arc<dyn MappingSource>) -> Self {
        Self {
            source,
            max_markets: DEFAULT_MAX_MARKETS,
        }
    }

    pub fn with_max_markets(mut self, max_markets: u64) -> Self {
        self.max_markets = max_markets;
        self
    }

    /// Number of markets registered on-chain. Unreadable counts are zero.
    pub async fn count(&self) -> u64 {
        let Some(raw) = self.source.read(mappings::MARKET_COUNT, COUNT_KEY).await else {
            return 0;
        };

        match parse_u64_literal(mappings::MARKET_COUNT, &raw) {
            Ok(count) => count,
            Err(e) => {
                warn!("Unreadable market count `{}`: {}", raw, e);
                0
            }
        }
    }

    pub async fn id_at(&self, index: u64) -> Option<MarketId> {
        let key = format!("{}u64", index);
        let raw = self.source.read(mappings::MARKET_IDS, &key).await?;

        match parse_field_literal(mappings::MARKET_IDS, &raw).and_then(|d| MarketId::parse(&d)) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Unreadable market id at index {}: {}", index, e);
                None
            }
        }
    }

    /// Resolves indices `0..count` in one concurrent wave. Indices that read
    /// as absent are skipped; order follows the index. Counts above
    /// `max_markets` are clamped.
    pub async fn ids(&self, count: u64) -> Vec<MarketId> {
        if count == 0 {
            return Vec::new();
        }

        let count = if count > self.max_markets {
            warn!(
                "Market count {} exceeds limit {}, listing the first {}",
                count, self.max_markets, self.max_markets
            );
            self.max_markets
        } else {
            count
        };

        let lookups = (0..count).map(|index| self.id_at(index));
        let ids: Vec<MarketId> = join_all(lookups).await.into_iter().flatten().collect();

        if ids.len() as u64 != count {
            warn!(
                "Market registry resolved {} of {} indices",
                ids.len(),
                count
            );
        }
        ids
    }

    pub async fn enumerate(&self) -> Vec<MarketId> {
        let count = self.count().await;
        info!("Total markets on-chain: {}", count);
        self.ids(count).await
    }

    /// Question hash the creator committed to when opening the market.
    pub async fn question_hash(&self, id: &MarketId) -> Option<String> {
        let raw = self
            .source
            .read(mappings::MARKET_QUESTIONS, &id.to_field_key())
            .await?;
        parse_field_literal(mappings::MARKET_QUESTIONS, &raw).ok()
    }
}
