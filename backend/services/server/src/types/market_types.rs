use serde::Deserialize;
use validator::Validate;

use super::string_or_number;

#[derive(Deserialize, Debug, Default)]
pub struct MarketsQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct BlockHeightQuery {
    #[serde(default)]
    pub days: Option<u64>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrackPendingRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    #[validate(length(min = 1, message = "marketId and question required"))]
    pub market_id: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "marketId and question required"))]
    pub question: String,

    #[serde(default)]
    pub ipfs_cid: Option<String>,
}
