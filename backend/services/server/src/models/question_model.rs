use aleo_client::{MarketId, ParseError};
use chrono::{DateTime, Utc};
use market_aggregator::QuestionMeta;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct QuestionTable {
    pub market_id: String,
    pub question: String,
    pub hash: Option<String>,
    pub ipfs_cid: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QuestionTable {
    pub fn into_meta(self) -> Result<QuestionMeta, ParseError> {
        Ok(QuestionMeta {
            market_id: MarketId::parse(&self.market_id)?,
            question: self.question,
            hash: self.hash,
            ipfs_cid: self.ipfs_cid,
            created_at: Some(self.created_at),
        })
    }
}
