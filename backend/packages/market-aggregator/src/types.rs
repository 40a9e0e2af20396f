use aleo_client::block_height::estimate_time_remaining;
use aleo_client::{MarketId, MarketInfo, Outcome, PoolState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn placeholder_question(id: &MarketId) -> String {
    format!("Market #{}", id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMeta {
    pub market_id: MarketId,
    pub question: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub ipfs_cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A market the user created that may not be visible on-chain yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMarket {
    pub id: MarketId,
    pub question: String,
    #[serde(default)]
    pub ipfs_cid: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything the UI needs to render one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub id: MarketId,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs_cid: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub resolution_height: Option<u32>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub winning_outcome: Option<u8>,
    #[serde(default)]
    pub total_yes: u64,
    #[serde(default)]
    pub total_no: u64,
    #[serde(default)]
    pub total_pool: u64,
    #[serde(default)]
    pub current_block_height: Option<u64>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub fn confirmed(
        id: MarketId,
        info: MarketInfo,
        pool: PoolState,
        meta: Option<&QuestionMeta>,
        current_block_height: u64,
    ) -> Self {
        let question = meta
            .map(|m| m.question.clone())
            .unwrap_or_else(|| placeholder_question(&id));

        Self {
            question,
            hash: meta.and_then(|m| m.hash.clone()),
            ipfs_cid: meta.and_then(|m| m.ipfs_cid.clone()),
            creator: Some(info.creator.clone()),
            resolution_height: Some(info.resolution_height),
            resolved: info.resolved,
            winning_outcome: info.outcome().map(Outcome::as_u8),
            total_yes: pool.total_yes,
            total_no: pool.total_no,
            total_pool: pool.total_pool,
            current_block_height: Some(current_block_height),
            pending: false,
            created_at: meta.and_then(|m| m.created_at),
            cached_at: None,
            id,
        }
    }

    /// Placeholder row for a market that is not on-chain yet: nothing is
    /// staked and nothing is resolved.
    pub fn pending(market: &PendingMarket) -> Self {
        Self {
            id: market.id.clone(),
            question: market.question.clone(),
            hash: None,
            ipfs_cid: market.ipfs_cid.clone(),
            creator: None,
            resolution_height: None,
            resolved: false,
            winning_outcome: None,
            total_yes: 0,
            total_no: 0,
            total_pool: 0,
            current_block_height: None,
            pending: true,
            created_at: Some(market.created_at),
            cached_at: None,
        }
    }

    pub fn time_remaining(&self) -> Option<String> {
        if self.pending {
            return None;
        }
        let resolution = self.resolution_height?;
        let current = self.current_block_height?;
        Some(estimate_time_remaining(u64::from(resolution), current))
    }
}
