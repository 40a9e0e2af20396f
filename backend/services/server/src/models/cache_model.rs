use aleo_client::MarketId;
use chrono::{DateTime, Utc};
use market_aggregator::{placeholder_question, MarketSnapshot, StoreError};
use serde_json::Value;
use sqlx::FromRow;

/// A `markets_cache` row joined with its indexed question, if any.
#[derive(Debug, Clone, FromRow)]
pub struct CachedMarketRow {
    pub market_id: String,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
    pub question: Option<String>,
}

impl CachedMarketRow {
    /// The row key overrides the blob's id, and the indexed question
    /// overrides whatever question the blob was stored with.
    pub fn into_snapshot(self) -> Result<MarketSnapshot, StoreError> {
        let id = MarketId::parse(&self.market_id)
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        let Value::Object(mut data) = self.data else {
            return Err(StoreError::InvalidRecord(format!(
                "cached data for market {} is not an object",
                id
            )));
        };

        let stored_question = data
            .get("question")
            .and_then(Value::as_str)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        let question = self
            .question
            .filter(|q| !q.is_empty())
            .or(stored_question)
            .unwrap_or_else(|| placeholder_question(&id));

        data.insert("id".to_string(), Value::String(id.to_string()));
        data.insert("question".to_string(), Value::String(question));
        data.remove("cachedAt");

        let mut snapshot: MarketSnapshot = serde_json::from_value(Value::Object(data))?;
        snapshot.cached_at = Some(self.updated_at);
        Ok(snapshot)
    }
}
