use serde::Deserialize;
use validator::Validate;

use super::string_or_number;

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuestionRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    #[validate(length(min = 1, message = "marketId and question required"))]
    pub market_id: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "marketId and question required"))]
    pub question: String,

    #[serde(default)]
    pub hash: Option<String>,

    #[serde(default)]
    pub ipfs_cid: Option<String>,
}
