use std::collections::HashMap;

use aleo_client::MarketId;
use async_trait::async_trait;
use log::warn;
use market_aggregator::{MarketCache, MarketSnapshot, OffChainIndex, QuestionMeta, StoreError};
use sqlx::migrate::MigrateError;
use sqlx::PgPool;

use crate::models::cache_model::CachedMarketRow;
use crate::models::question_model::QuestionTable;

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Postgres-backed question index and market snapshot cache.
#[derive(Clone)]
pub struct PgMarketStore {
    pool: PgPool,
}

impl PgMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Every indexed question, newest first. Rows with an unusable id are
    /// skipped.
    pub async fn list_questions(&self) -> Result<Vec<QuestionMeta>, StoreError> {
        let rows = sqlx::query_as::<_, QuestionTable>(
            r#"
            SELECT market_id, question, hash, ipfs_cid, created_at
            FROM market_questions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let market_id = row.market_id.clone();
                row.into_meta()
                    .map_err(|e| warn!("Skipping question row {}: {}", market_id, e))
                    .ok()
            })
            .collect())
    }

    pub async fn question_count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM market_questions")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl OffChainIndex for PgMarketStore {
    async fn upsert(&self, meta: QuestionMeta) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO market_questions (market_id, question, hash, ipfs_cid)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (market_id)
            DO UPDATE SET question = EXCLUDED.question,
                          hash = EXCLUDED.hash,
                          ipfs_cid = EXCLUDED.ipfs_cid,
                          created_at = NOW()
            "#,
        )
        .bind(meta.market_id.as_str())
        .bind(&meta.question)
        .bind(&meta.hash)
        .bind(&meta.ipfs_cid)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: &MarketId) -> Result<Option<QuestionMeta>, StoreError> {
        let row = sqlx::query_as::<_, QuestionTable>(
            r#"
            SELECT market_id, question, hash, ipfs_cid, created_at
            FROM market_questions
            WHERE market_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|r| r.into_meta())
            .transpose()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))
    }

    async fn list_all(&self) -> Result<HashMap<MarketId, QuestionMeta>, StoreError> {
        let questions = self.list_questions().await?;
        Ok(questions
            .into_iter()
            .map(|q| (q.market_id.clone(), q))
            .collect())
    }
}

#[async_trait]
impl MarketCache for PgMarketStore {
    async fn list(&self) -> Result<Vec<MarketSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, CachedMarketRow>(
            r#"
            SELECT mc.market_id, mc.data, mc.updated_at, mq.question
            FROM markets_cache mc
            LEFT JOIN market_questions mq ON mc.market_id = mq.market_id
            ORDER BY mc.updated_at DESC, LENGTH(mc.market_id), mc.market_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let market_id = row.market_id.clone();
                row.into_snapshot()
                    .map_err(|e| warn!("Skipping cached market {}: {}", market_id, e))
                    .ok()
            })
            .collect())
    }

    async fn store(&self, markets: &[MarketSnapshot]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        for market in markets {
            let mut row = market.clone();
            row.cached_at = None;
            let data = serde_json::to_value(&row)?;

            sqlx::query(
                r#"
                INSERT INTO markets_cache (market_id, data, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (market_id)
                DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
                "#,
            )
            .bind(market.id.as_str())
            .bind(data)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(markets.len())
    }
}
