use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use aleo_client::config::mappings;
use aleo_client::{
    parse_market_info, parse_pool_state, BlockHeightTracker, MappingSource, MarketId, MarketInfo,
    MarketRegistry, PoolState,
};
use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::pending::{LocalPendingTracker, PendingError};
use crate::store::{MarketCache, OffChainIndex};
use crate::types::{MarketSnapshot, PendingMarket, QuestionMeta};

/// Longest one market's mapping reads may take before it is dropped from a
/// refresh.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds the market list from chain mappings, the off-chain index, the
/// snapshot cache and locally pending markets.
///
/// Reads are stale-while-revalidate: a non-empty cache is served as is and a
/// refresh is spawned behind it. Nothing here fails the caller; unreadable
/// markets are dropped and an unreadable registry gives an empty list.
#[derive(Clone)]
pub struct MarketAggregator {
    chain: Arc<dyn MappingSource>,
    registry: MarketRegistry,
    heights: Arc<BlockHeightTracker>,
    index: Arc<dyn OffChainIndex>,
    cache: Arc<dyn MarketCache>,
    pending: LocalPendingTracker,
    read_timeout: Duration,
}

impl MarketAggregator {
    pub fn new(
        chain: Arc<dyn MappingSource>,
        heights: Arc<BlockHeightTracker>,
        index: Arc<dyn OffChainIndex>,
        cache: Arc<dyn MarketCache>,
        pending: LocalPendingTracker,
    ) -> Self {
        Self {
            registry: MarketRegistry::new(chain.clone()),
            chain,
            heights,
            index,
            cache,
            pending,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_max_markets(mut self, max_markets: u64) -> Self {
        self.registry = self.registry.with_max_markets(max_markets);
        self
    }

    pub fn heights(&self) -> &BlockHeightTracker {
        &self.heights
    }

    pub async fn list_markets(&self) -> Vec<MarketSnapshot> {
        let cached = match self.cache.list().await {
            Ok(markets) => markets,
            Err(e) => {
                warn!("Market cache read failed: {}", e);
                Vec::new()
            }
        };

        let markets = if cached.is_empty() {
            info!("Market cache empty, loading from chain");
            self.refresh_and_store().await
        } else {
            info!("Loaded {} markets from cache", cached.len());
            // Detached; the next read picks up whatever it writes.
            drop(self.spawn_background_refresh());
            cached
        };

        self.reconcile_pending(markets)
    }

    /// Skips the cache and rebuilds from chain before answering.
    pub async fn list_markets_fresh(&self) -> Vec<MarketSnapshot> {
        let markets = self.refresh_and_store().await;
        self.reconcile_pending(markets)
    }

    /// Runs `refresh_and_store` on its own task. The handle yields the
    /// number of markets refreshed, or `None` when the refresh panicked; the
    /// panic is logged either way.
    pub fn spawn_background_refresh(&self) -> JoinHandle<Option<usize>> {
        let aggregator = self.clone();
        let refresh = tokio::spawn(async move { aggregator.refresh_and_store().await.len() });

        tokio::spawn(async move {
            match refresh.await {
                Ok(count) => {
                    debug!("Background refresh finished with {} markets", count);
                    Some(count)
                }
                Err(e) => {
                    error!("Background market refresh failed: {}", e);
                    None
                }
            }
        })
    }

    /// Full refresh followed by a cache write-back. Write-back failures are
    /// logged only; an empty result never overwrites the cache.
    pub async fn refresh_and_store(&self) -> Vec<MarketSnapshot> {
        let markets = self.full_refresh().await;

        if !markets.is_empty() {
            match self.cache.store(&markets).await {
                Ok(count) => info!("Cache updated with {} markets from chain", count),
                Err(e) => warn!("Failed to write market cache: {}", e),
            }
        }

        markets
    }

    pub async fn full_refresh(&self) -> Vec<MarketSnapshot> {
        let count = self.registry.count().await;
        if count == 0 {
            info!("No markets registered on-chain");
            return Vec::new();
        }

        let (ids, questions, height) = tokio::join!(
            self.registry.ids(count),
            self.load_questions(),
            self.heights.current_height(),
        );

        if ids.is_empty() {
            warn!(
                "Registry reports {} markets but no market id could be read",
                count
            );
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let ids: Vec<MarketId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();

        let snapshots = join_all(
            ids.iter()
                .map(|id| self.fetch_snapshot_bounded(id, &questions, height)),
        )
        .await;

        let markets: Vec<MarketSnapshot> = snapshots.into_iter().flatten().collect();
        info!("Assembled {} of {} markets from chain", markets.len(), ids.len());
        markets
    }

    /// One market with its metadata, falling back to the pending entry when
    /// the chain does not know the id yet. The on-chain question hash fills
    /// in when the index has none; a disagreement is logged and the indexed
    /// hash kept.
    pub async fn market_details(&self, id: &MarketId) -> Option<MarketSnapshot> {
        let (info, pool, meta, chain_hash, height) = tokio::join!(
            self.market_info(id),
            self.pool_state(id),
            self.question_for(id),
            self.registry.question_hash(id),
            self.heights.current_height(),
        );

        let Some(info) = info else {
            return self.pending.get(id).map(|p| MarketSnapshot::pending(&p));
        };

        let mut market = MarketSnapshot::confirmed(
            id.clone(),
            info,
            pool.unwrap_or_default(),
            meta.as_ref(),
            height,
        );
        if let Some(chain_hash) = chain_hash {
            match market.hash.as_deref() {
                None => market.hash = Some(chain_hash),
                Some(indexed) if indexed != chain_hash => warn!(
                    "Indexed question hash for market {} is {}, chain has {}",
                    id, indexed, chain_hash
                ),
                Some(_) => {}
            }
        }
        Some(market)
    }

    pub fn track_pending(&self, market: PendingMarket) -> Result<bool, PendingError> {
        self.pending.track(market)
    }

    /// Appends pending markets the chain does not list yet. Pending entries
    /// whose id is confirmed are discarded, not merged.
    pub fn reconcile_pending(&self, markets: Vec<MarketSnapshot>) -> Vec<MarketSnapshot> {
        let mut merged: Vec<MarketSnapshot> = markets.into_iter().filter(|m| !m.pending).collect();
        let confirmed: HashSet<MarketId> = merged.iter().map(|m| m.id.clone()).collect();

        match self.pending.supersede(&confirmed) {
            Ok(0) => {}
            Ok(removed) => info!("{} pending markets confirmed on-chain", removed),
            Err(e) => warn!("Could not prune pending markets: {}", e),
        }

        merged.extend(
            self.pending
                .list()
                .iter()
                .filter(|p| !confirmed.contains(&p.id))
                .map(MarketSnapshot::pending),
        );
        merged
    }

    async fn fetch_snapshot_bounded(
        &self,
        id: &MarketId,
        questions: &HashMap<MarketId, QuestionMeta>,
        height: u64,
    ) -> Option<MarketSnapshot> {
        match tokio::time::timeout(self.read_timeout, self.fetch_snapshot(id, questions, height))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!(
                    "Dropping market {}: chain reads exceeded {:?}",
                    id, self.read_timeout
                );
                None
            }
        }
    }

    async fn fetch_snapshot(
        &self,
        id: &MarketId,
        questions: &HashMap<MarketId, QuestionMeta>,
        height: u64,
    ) -> Option<MarketSnapshot> {
        let (info, pool) = tokio::join!(self.market_info(id), self.pool_state(id));

        let (Some(info), Some(pool)) = (info, pool) else {
            debug!("Skipping market {}: incomplete on-chain state", id);
            return None;
        };

        Some(MarketSnapshot::confirmed(
            id.clone(),
            info,
            pool,
            questions.get(id),
            height,
        ))
    }

    async fn market_info(&self, id: &MarketId) -> Option<MarketInfo> {
        let raw = self.chain.read(mappings::MARKETS, &id.to_field_key()).await?;
        match parse_market_info(&raw) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Discarding market {}: bad `markets` value: {}", id, e);
                None
            }
        }
    }

    async fn pool_state(&self, id: &MarketId) -> Option<PoolState> {
        let raw = self.chain.read(mappings::POOLS, &id.to_field_key()).await?;
        match parse_pool_state(&raw) {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Discarding market {}: bad `pools` value: {}", id, e);
                None
            }
        }
    }

    async fn load_questions(&self) -> HashMap<MarketId, QuestionMeta> {
        match self.index.list_all().await {
            Ok(questions) => {
                debug!("Fetched {} indexed questions", questions.len());
                questions
            }
            Err(e) => {
                warn!("Failed to fetch indexed questions: {}", e);
                HashMap::new()
            }
        }
    }

    async fn question_for(&self, id: &MarketId) -> Option<QuestionMeta> {
        match self.index.get(id).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Failed to fetch question for market {}: {}", id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use aleo_client::{ChainError, HeightSource};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct FakeChain {
        values: Mutex<HashMap<(String, String), String>>,
        reads: Mutex<Vec<(String, String)>>,
        stalled: Mutex<HashSet<(String, String)>>,
        gate: Semaphore,
    }

    impl FakeChain {
        fn with_permits(permits: usize) -> Arc<Self> {
            Arc::new(Self {
                values: Mutex::new(HashMap::new()),
                reads: Mutex::new(Vec::new()),
                stalled: Mutex::new(HashSet::new()),
                gate: Semaphore::new(permits),
            })
        }

        fn new() -> Arc<Self> {
            Self::with_permits(1)
        }

        fn gated() -> Arc<Self> {
            Self::with_permits(0)
        }

        /// Reads of this key never complete.
        fn stall(&self, mapping: &str, key: &str) {
            self.stalled
                .lock()
                .unwrap()
                .insert((mapping.to_string(), key.to_string()));
        }

        fn open(&self) {
            self.gate.add_permits(1);
        }

        fn set(&self, mapping: &str, key: &str, value: &str) {
            self.values
                .lock()
                .unwrap()
                .insert((mapping.to_string(), key.to_string()), value.to_string());
        }

        fn add_market(&self, index: u64, id: u64, yes: u64, no: u64) {
            self.set("market_ids", &format!("{}u64", index), &format!("{}field", id));
            self.set(
                "markets",
                &format!("{}field", id),
                &format!(
                    "{{\\n  creator: aleo1maker{},\\n  resolution_height: 500000u32,\\n  resolved: false,\\n  winning_outcome: 0u8\\n}}",
                    id
                ),
            );
            self.set_pool(id, yes, no);
        }

        fn set_pool(&self, id: u64, yes: u64, no: u64) {
            self.set(
                "pools",
                &format!("{}field", id),
                &format!(
                    "{{ total_yes: {}u64, total_no: {}u64, total_pool: {}u64 }}",
                    yes,
                    no,
                    yes + no
                ),
            );
        }

        fn reads_of(&self, mapping: &str) -> Vec<String> {
            self.reads
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _)| m == mapping)
                .map(|(_, k)| k.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MappingSource for FakeChain {
        async fn read(&self, mapping: &str, key: &str) -> Option<String> {
            let entry = (mapping.to_string(), key.to_string());
            let stalled = self.stalled.lock().unwrap().contains(&entry);
            if stalled {
                std::future::pending::<()>().await;
            }
            let _permit = self.gate.acquire().await.ok()?;
            self.reads
                .lock()
                .unwrap()
                .push((mapping.to_string(), key.to_string()));
            self.values
                .lock()
                .unwrap()
                .get(&(mapping.to_string(), key.to_string()))
                .cloned()
        }
    }

    struct FakeHeights(AtomicU64);

    struct SilentHeights;

    #[async_trait]
    impl HeightSource for SilentHeights {
        async fn latest_height(&self) -> Result<u64, ChainError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl HeightSource for FakeHeights {
        async fn latest_height(&self) -> Result<u64, ChainError> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[derive(Default)]
    struct MemoryIndex {
        rows: Mutex<HashMap<MarketId, QuestionMeta>>,
        broken: AtomicBool,
    }

    #[async_trait]
    impl OffChainIndex for MemoryIndex {
        async fn upsert(&self, meta: QuestionMeta) -> Result<(), StoreError> {
            self.rows.lock().unwrap().insert(meta.market_id.clone(), meta);
            Ok(())
        }

        async fn get(&self, id: &MarketId) -> Result<Option<QuestionMeta>, StoreError> {
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }

        async fn list_all(&self) -> Result<HashMap<MarketId, QuestionMeta>, StoreError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("index offline".into()));
            }
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct MemoryCache {
        rows: Mutex<Vec<MarketSnapshot>>,
        writes: AtomicUsize,
        broken: AtomicBool,
        panics: AtomicBool,
    }

    #[async_trait]
    impl MarketCache for MemoryCache {
        async fn list(&self) -> Result<Vec<MarketSnapshot>, StoreError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn store(&self, markets: &[MarketSnapshot]) -> Result<usize, StoreError> {
            if self.panics.load(Ordering::SeqCst) {
                panic!("cache driver crashed");
            }
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("cache offline".into()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            for market in markets {
                match rows.iter_mut().find(|r| r.id == market.id) {
                    Some(row) => *row = market.clone(),
                    None => rows.push(market.clone()),
                }
            }
            Ok(markets.len())
        }
    }

    struct Harness {
        chain: Arc<FakeChain>,
        index: Arc<MemoryIndex>,
        cache: Arc<MemoryCache>,
        aggregator: MarketAggregator,
    }

    fn harness_with(chain: Arc<FakeChain>) -> Harness {
        harness_with_heights(
            chain,
            BlockHeightTracker::new(Arc::new(FakeHeights(AtomicU64::new(1_000))), Duration::ZERO),
        )
    }

    fn harness_with_heights(chain: Arc<FakeChain>, heights: BlockHeightTracker) -> Harness {
        let index = Arc::new(MemoryIndex::default());
        let cache = Arc::new(MemoryCache::default());
        let heights = Arc::new(heights);
        let aggregator = MarketAggregator::new(
            chain.clone(),
            heights,
            index.clone(),
            cache.clone(),
            LocalPendingTracker::new(),
        );
        Harness { chain, index, cache, aggregator }
    }

    fn harness() -> Harness {
        harness_with(FakeChain::new())
    }

    fn id(raw: &str) -> MarketId {
        MarketId::parse(raw).unwrap()
    }

    fn question(market: &str, text: &str) -> QuestionMeta {
        QuestionMeta {
            market_id: id(market),
            question: text.to_string(),
            hash: None,
            ipfs_cid: None,
            created_at: None,
        }
    }

    fn pending(market: &str, text: &str) -> PendingMarket {
        PendingMarket {
            id: id(market),
            question: text.to_string(),
            ipfs_cid: None,
            created_at: Utc::now(),
        }
    }

    fn ids_of(markets: &[MarketSnapshot]) -> Vec<String> {
        markets.iter().map(|m| m.id.to_string()).collect()
    }

    #[tokio::test]
    async fn zero_count_reads_nothing_else() {
        let h = harness();
        h.chain.set("market_count", "0u64", "0u64");

        assert!(h.aggregator.full_refresh().await.is_empty());
        assert!(h.chain.reads_of("market_ids").is_empty());
        assert!(h.chain.reads_of("markets").is_empty());
        assert!(h.chain.reads_of("pools").is_empty());
    }

    #[tokio::test]
    async fn unreadable_registry_yields_empty_list() {
        let h = harness();
        h.chain.set("market_count", "0u64", "2u64");

        assert!(h.aggregator.list_markets().await.is_empty());
        assert_eq!(h.cache.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn torn_index_limits_fetches_to_surviving_ids() {
        let h = harness();
        h.chain.set("market_count", "0u64", "3u64");
        h.chain.add_market(0, 10, 5, 5);
        h.chain.add_market(2, 30, 1, 2);

        let markets = h.aggregator.full_refresh().await;
        assert_eq!(ids_of(&markets), vec!["10", "30"]);

        let mut fetched = h.chain.reads_of("markets");
        fetched.sort();
        assert_eq!(fetched, vec!["10field", "30field"]);
        assert_eq!(h.chain.reads_of("pools").len(), 2);
    }

    #[tokio::test]
    async fn unparsable_market_is_dropped_alone() {
        let h = harness();
        h.chain.set("market_count", "0u64", "2u64");
        h.chain.add_market(0, 10, 5, 5);
        h.chain.add_market(1, 20, 1, 1);
        h.chain.set(
            "pools",
            "20field",
            "{ total_yes: 1u64, total_no: 1u64, total_pool: 9u64 }",
        );

        let markets = h.aggregator.full_refresh().await;
        assert_eq!(ids_of(&markets), vec!["10"]);
        assert_eq!(markets[0].total_pool, 10);
    }

    #[tokio::test]
    async fn missing_question_uses_placeholder() {
        let h = harness();
        h.chain.set("market_count", "0u64", "2u64");
        h.chain.add_market(0, 10, 1, 1);
        h.chain.add_market(1, 11, 1, 1);
        h.index.upsert(question("10", "Indexed?")).await.unwrap();

        let markets = h.aggregator.full_refresh().await;
        assert_eq!(markets[0].question, "Indexed?");
        assert_eq!(markets[1].question, "Market #11");
    }

    #[tokio::test]
    async fn index_outage_degrades_to_placeholders() {
        let h = harness();
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 1, 1);
        h.index.upsert(question("10", "Indexed?")).await.unwrap();
        h.index.broken.store(true, Ordering::SeqCst);

        let markets = h.aggregator.full_refresh().await;
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].question, "Market #10");
    }

    #[tokio::test]
    async fn refresh_is_idempotent_apart_from_height() {
        let h = harness();
        h.chain.set("market_count", "0u64", "2u64");
        h.chain.add_market(0, 10, 3, 4);
        h.chain.add_market(1, 20, 0, 9);
        h.index.upsert(question("20", "Twenty?")).await.unwrap();

        let strip = |mut markets: Vec<MarketSnapshot>| {
            for m in markets.iter_mut() {
                m.current_block_height = None;
            }
            serde_json::to_string(&markets).unwrap()
        };

        let first = h.aggregator.full_refresh().await;
        let second = h.aggregator.full_refresh().await;
        assert_ne!(first[0].current_block_height, second[0].current_block_height);
        assert_eq!(strip(first), strip(second));
    }

    #[tokio::test]
    async fn block_height_is_read_once_per_batch() {
        let h = harness();
        h.chain.set("market_count", "0u64", "3u64");
        for (index, market) in [(0, 10), (1, 20), (2, 30)] {
            h.chain.add_market(index, market, 1, 1);
        }

        let markets = h.aggregator.full_refresh().await;
        let heights: HashSet<Option<u64>> =
            markets.iter().map(|m| m.current_block_height).collect();
        assert_eq!(heights.len(), 1);
    }

    #[tokio::test]
    async fn empty_cache_refreshes_synchronously_and_populates() {
        let h = harness();
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 2, 2);

        let markets = h.aggregator.list_markets().await;
        assert_eq!(ids_of(&markets), vec!["10"]);
        assert_eq!(h.cache.writes.load(Ordering::SeqCst), 1);
        assert_eq!(ids_of(&h.cache.list().await.unwrap()), vec!["10"]);
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_fail_read() {
        let h = harness();
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 2, 2);
        h.cache.broken.store(true, Ordering::SeqCst);

        assert_eq!(ids_of(&h.aggregator.list_markets().await), vec!["10"]);
    }

    #[tokio::test]
    async fn serves_stale_cache_then_revalidates() {
        let h = harness_with(FakeChain::gated());
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 50, 50);

        let mut stale = MarketSnapshot::pending(&pending("10", "Old question"));
        stale.pending = false;
        h.cache.store(&[stale]).await.unwrap();

        // The chain is blocked, so only the cache can answer.
        let served = tokio::time::timeout(Duration::from_secs(1), h.aggregator.list_markets())
            .await
            .expect("cached read must not wait on the chain");
        assert_eq!(served.len(), 1);
        assert_eq!(served[0].total_pool, 0);

        h.chain.open();
        tokio::time::timeout(Duration::from_secs(5), async {
            while h.cache.writes.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("background refresh should write the cache");

        let refreshed = h.aggregator.list_markets().await;
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].total_pool, 100);
        assert_eq!(refreshed[0].question, "Market #10");
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() {
        let h = harness();
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 1, 1);
        let mut stale = MarketSnapshot::pending(&pending("99", "Gone"));
        stale.pending = false;
        h.cache.store(&[stale]).await.unwrap();

        assert_eq!(ids_of(&h.aggregator.list_markets_fresh().await), vec!["10"]);
    }

    #[tokio::test]
    async fn pending_market_is_superseded_once_confirmed() {
        let h = harness();
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 1, 1);
        h.aggregator
            .track_pending(pending("20", "Local question"))
            .unwrap();

        let before = h.aggregator.list_markets_fresh().await;
        assert_eq!(ids_of(&before), vec!["10", "20"]);
        assert!(before[1].pending);
        assert_eq!(before[1].question, "Local question");
        assert_eq!(before[1].total_pool, 0);

        h.chain.set("market_count", "0u64", "2u64");
        h.chain.add_market(1, 20, 4, 4);
        h.index.upsert(question("20", "Indexed question")).await.unwrap();

        let after = h.aggregator.list_markets_fresh().await;
        assert_eq!(ids_of(&after), vec!["10", "20"]);
        assert!(after.iter().all(|m| !m.pending));
        assert_eq!(after[1].question, "Indexed question");
        assert!(h.aggregator.pending.list().is_empty());
    }

    #[tokio::test]
    async fn concurrent_refreshes_leave_one_row_per_market() {
        let h = harness();
        h.chain.set("market_count", "0u64", "2u64");
        h.chain.add_market(0, 10, 1, 1);
        h.chain.add_market(1, 20, 2, 2);

        let (a, b) = tokio::join!(
            h.aggregator.spawn_background_refresh(),
            h.aggregator.spawn_background_refresh()
        );
        assert_eq!((a.unwrap(), b.unwrap()), (Some(2), Some(2)));

        let rows = h.cache.list().await.unwrap();
        assert_eq!(ids_of(&rows), vec!["10", "20"]);
    }

    #[tokio::test]
    async fn last_cache_write_wins_without_merging() {
        let h = harness();
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 1, 1);
        let older = h.aggregator.full_refresh().await;

        h.chain.set_pool(10, 7, 3);
        let newer = h.aggregator.full_refresh().await;

        h.cache.store(&newer).await.unwrap();
        h.cache.store(&older).await.unwrap();

        let rows = h.cache.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], older[0]);
    }

    #[tokio::test]
    async fn details_fall_back_to_pending_entry() {
        let h = harness();
        h.chain.add_market(0, 10, 2, 3);
        h.aggregator.track_pending(pending("77", "Waiting")).unwrap();

        let live = h.aggregator.market_details(&id("10")).await.unwrap();
        assert_eq!(live.total_pool, 5);
        assert!(!live.pending);

        let waiting = h.aggregator.market_details(&id("77")).await.unwrap();
        assert!(waiting.pending);

        assert!(h.aggregator.market_details(&id("404")).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_height_source_does_not_block_listing() {
        let heights = BlockHeightTracker::new(Arc::new(SilentHeights), Duration::from_secs(10))
            .with_fetch_timeout(Duration::from_secs(1));
        let h = harness_with_heights(FakeChain::new(), heights);
        h.chain.set("market_count", "0u64", "2u64");
        h.chain.add_market(0, 10, 1, 1);
        h.chain.add_market(1, 20, 2, 2);

        let markets = tokio::time::timeout(Duration::from_secs(3), h.aggregator.list_markets())
            .await
            .expect("listing must not wait on a silent height source");
        assert_eq!(ids_of(&markets), vec!["10", "20"]);
        assert!(markets
            .iter()
            .all(|m| m.current_block_height == Some(aleo_client::BOOTSTRAP_HEIGHT)));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_market_read_drops_only_that_market() {
        let h = harness_with(FakeChain::new());
        h.chain.set("market_count", "0u64", "2u64");
        h.chain.add_market(0, 10, 1, 1);
        h.chain.add_market(1, 20, 2, 2);
        h.chain.stall("pools", "20field");

        let aggregator = h.aggregator.clone().with_read_timeout(Duration::from_secs(2));
        let markets = tokio::time::timeout(Duration::from_secs(5), aggregator.full_refresh())
            .await
            .expect("a stalled read must be bounded");
        assert_eq!(ids_of(&markets), vec!["10"]);
    }

    #[tokio::test]
    async fn background_refresh_panic_is_contained() {
        let h = harness();
        h.chain.set("market_count", "0u64", "1u64");
        h.chain.add_market(0, 10, 1, 1);
        h.cache.panics.store(true, Ordering::SeqCst);

        let outcome = h.aggregator.spawn_background_refresh().await.unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn details_carry_on_chain_question_hash() {
        let h = harness();
        h.chain.add_market(0, 10, 1, 1);
        h.chain.add_market(1, 11, 1, 1);
        h.chain.set("market_questions", "10field", "555field");
        h.chain.set("market_questions", "11field", "777field");

        let mut indexed = question("11", "Eleven?");
        indexed.hash = Some("999".to_string());
        h.index.upsert(indexed).await.unwrap();

        let from_chain = h.aggregator.market_details(&id("10")).await.unwrap();
        assert_eq!(from_chain.hash.as_deref(), Some("555"));

        let from_index = h.aggregator.market_details(&id("11")).await.unwrap();
        assert_eq!(from_index.hash.as_deref(), Some("999"));
        assert_eq!(from_index.question, "Eleven?");
    }

    #[tokio::test]
    async fn implausible_count_is_clamped() {
        let h = harness();
        h.chain.set("market_count", "0u64", "18446744073709551615u64");
        h.chain.add_market(0, 10, 1, 1);
        h.chain.add_market(1, 20, 1, 1);

        let aggregator = h.aggregator.clone().with_max_markets(2);
        assert_eq!(ids_of(&aggregator.full_refresh().await), vec!["10", "20"]);
        assert_eq!(h.chain.reads_of("market_ids").len(), 2);
    }
}
