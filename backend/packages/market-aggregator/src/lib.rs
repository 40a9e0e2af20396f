pub mod aggregator;
pub mod pending;
pub mod store;
pub mod types;

pub use aggregator::MarketAggregator;
pub use pending::{LocalPendingTracker, PendingError};
pub use store::{MarketCache, OffChainIndex, StoreError};
pub use types::{placeholder_question, MarketSnapshot, PendingMarket, QuestionMeta};
