use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

const FIELD_SUFFIX: &str = "field";

/// Market identifier, kept as the decimal digits of the chain's field element.
///
/// Field elements exceed every native integer width, so the id stays a
/// string. Any `field` suffix and leading zeros are stripped on the way in,
/// which makes `"010field"`, `"10field"` and `"10"` the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim().trim_matches('"');
        let trimmed = trimmed.strip_suffix(".public").unwrap_or(trimmed);
        let digits = trimmed.strip_suffix(FIELD_SUFFIX).unwrap_or(trimmed);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidMarketId(raw.to_string()));
        }

        let canonical = digits.trim_start_matches('0');
        let canonical = if canonical.is_empty() { "0" } else { canonical };
        Ok(Self(canonical.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key form expected by mappings indexed by market id.
    pub fn to_field_key(&self) -> String {
        format!("{}{}", self.0, FIELD_SUFFIX)
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MarketId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MarketId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MarketId> for String {
    fn from(id: MarketId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    No,
    Yes,
}

impl Outcome {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Outcome::No),
            1 => Some(Outcome::Yes),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Outcome::No => 0,
            Outcome::Yes => 1,
        }
    }
}

/// Value of the `markets` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    pub creator: String,
    pub resolution_height: u32,
    pub resolved: bool,
    pub winning_outcome: u8,
}

impl MarketInfo {
    /// Winning side, only once the market is resolved.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.resolved {
            Outcome::from_u8(self.winning_outcome)
        } else {
            None
        }
    }
}

/// Value of the `pools` mapping, in microcredits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    pub total_yes: u64,
    pub total_no: u64,
    pub total_pool: u64,
}
