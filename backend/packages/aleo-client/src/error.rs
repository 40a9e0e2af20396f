use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed response body: {0}")]
    Body(String),
}

/// Raised when mapping text does not have the expected shape. Callers treat
/// any of these exactly like an absent value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty mapping value")]
    Empty,

    #[error("malformed struct literal: {0}")]
    Malformed(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("duplicate field `{0}`")]
    DuplicateField(String),

    #[error("field `{0}` holds a nested value")]
    NestedValue(String),

    #[error("invalid literal for `{field}`: {value}")]
    InvalidLiteral { field: String, value: String },

    #[error("value for `{field}` does not fit its type: {value}")]
    Overflow { field: String, value: String },

    #[error("pool totals disagree: yes {yes} + no {no} != pool {pool}")]
    PoolMismatch { yes: u64, no: u64, pool: u64 },

    #[error("invalid market id: {0}")]
    InvalidMarketId(String),
}
