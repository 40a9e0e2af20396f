use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://api.explorer.provable.com/v1";
pub const DEFAULT_NETWORK: &str = "testnet";
pub const DEFAULT_PROGRAM_ID: &str = "dark_pool_marketv1.aleo";

/// Upper bound for one request to the node, connect through body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Mapping names declared by the market program.
pub mod mappings {
    pub const MARKETS: &str = "markets";
    pub const POOLS: &str = "pools";
    pub const MARKET_COUNT: &str = "market_count";
    pub const MARKET_IDS: &str = "market_ids";
    pub const MARKET_QUESTIONS: &str = "market_questions";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AleoConfig {
    pub rpc_url: String,
    pub network: String,
    pub program_id: String,
    pub request_timeout: Duration,
}

impl AleoConfig {
    pub fn new(
        rpc_url: impl Into<String>,
        network: impl Into<String>,
        program_id: impl Into<String>,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into().trim_end_matches('/').to_string(),
            network: network.into(),
            program_id: program_id.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn mapping_url(&self, mapping: &str, key: &str) -> String {
        format!(
            "{}/{}/program/{}/mapping/{}/{}",
            self.rpc_url, self.network, self.program_id, mapping, key
        )
    }

    pub fn latest_height_url(&self) -> String {
        format!("{}/{}/block/height/latest", self.rpc_url, self.network)
    }
}

impl Default for AleoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RPC_URL, DEFAULT_NETWORK, DEFAULT_PROGRAM_ID)
    }
}
