use std::collections::HashMap;

use aleo_client::MarketId;
use async_trait::async_trait;
use thiserror::Error;

use crate::types::{MarketSnapshot, QuestionMeta};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
}

/// Question metadata keyed by market id. Upserts are last-write-wins.
#[async_trait]
pub trait OffChainIndex: Send + Sync {
    async fn upsert(&self, meta: QuestionMeta) -> Result<(), StoreError>;

    async fn get(&self, id: &MarketId) -> Result<Option<QuestionMeta>, StoreError>;

    async fn list_all(&self) -> Result<HashMap<MarketId, QuestionMeta>, StoreError>;
}

/// Materialized market snapshots, one row per market id.
#[async_trait]
pub trait MarketCache: Send + Sync {
    async fn list(&self) -> Result<Vec<MarketSnapshot>, StoreError>;

    /// Upserts every snapshot and returns how many rows were written.
    async fn store(&self, markets: &[MarketSnapshot]) -> Result<usize, StoreError>;
}
