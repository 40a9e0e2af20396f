pub mod block_height;
pub mod config;
pub mod error;
pub mod mapping_reader;
pub mod registry;
pub mod struct_parser;
pub mod types;

pub use block_height::{BlockHeightTracker, HeightSource, BOOTSTRAP_HEIGHT};
pub use config::AleoConfig;
pub use error::{ChainError, ParseError};
pub use mapping_reader::{AleoRpcClient, MappingSource};
pub use registry::MarketRegistry;
pub use struct_parser::{parse_market_info, parse_pool_state};
pub use types::{MarketId, MarketInfo, Outcome, PoolState};
