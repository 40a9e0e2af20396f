//! Parsing of the struct literals returned by mapping reads.
//!
//! The node returns values such as
//!
//! ```text
//! "{\n  creator: aleo1...,\n  resolution_height: 500000u32,\n  resolved: false,\n  winning_outcome: 0u8\n}"
//! ```
//!
//! but the same value may arrive compacted, unquoted, without braces or
//! without commas depending on the path it took. Text is normalized, split
//! into tokens and read as a flat list of `key: value` entries. Field order is
//! free; a missing, repeated, nested or mistyped field rejects the whole value.

use std::str::FromStr;

use crate::error::ParseError;
use crate::types::{MarketInfo, PoolState};

const ADDRESS_PREFIX: &str = "aleo1";

/// Strips one pair of surrounding quotes, turns escaped newlines/tabs into
/// spaces and collapses every whitespace run to a single space.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);

    unquoted
        .replace("\\n", " ")
        .replace("\\r", " ")
        .replace("\\t", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Colon,
    Comma,
    Open,
    Close,
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    for (idx, ch) in input.char_indices() {
        let punct = match ch {
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '{' | '[' => Some(Token::Open),
            '}' | ']' => Some(Token::Close),
            _ => None,
        };

        if punct.is_some() || ch.is_whitespace() {
            if let Some(start) = word_start.take() {
                tokens.push(Token::Word(&input[start..idx]));
            }
            if let Some(token) = punct {
                tokens.push(token);
            }
        } else if word_start.is_none() {
            word_start = Some(idx);
        }
    }

    if let Some(start) = word_start {
        tokens.push(Token::Word(&input[start..]));
    }

    tokens
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Fields<'a> {
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> Fields<'a> {
    fn parse(input: &'a str) -> Result<Self, ParseError> {
        let tokens = tokenize(input);
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let body = match (tokens.first(), tokens.last()) {
            (Some(Token::Open), Some(Token::Close)) if tokens.len() >= 2 => {
                &tokens[1..tokens.len() - 1]
            }
            (Some(Token::Open), _) | (_, Some(Token::Close)) => {
                return Err(ParseError::Malformed("unbalanced braces".to_string()));
            }
            _ => &tokens[..],
        };

        let mut entries: Vec<(&'a str, &'a str)> = Vec::new();
        let mut idx = 0;

        while idx < body.len() {
            let key = match body[idx] {
                Token::Word(word) if is_identifier(word) => word,
                other => {
                    return Err(ParseError::Malformed(format!(
                        "expected field name, found {:?}",
                        other
                    )));
                }
            };

            if body.get(idx + 1) != Some(&Token::Colon) {
                return Err(ParseError::Malformed(format!("expected `:` after `{}`", key)));
            }

            let value = match body.get(idx + 2) {
                Some(Token::Word(word)) => *word,
                Some(Token::Open) => return Err(ParseError::NestedValue(key.to_string())),
                _ => {
                    return Err(ParseError::Malformed(format!("missing value for `{}`", key)));
                }
            };

            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(ParseError::DuplicateField(key.to_string()));
            }
            entries.push((key, value));

            idx += 3;
            if body.get(idx) == Some(&Token::Comma) {
                idx += 1;
            }
        }

        Ok(Self { entries })
    }

    fn take(&self, name: &'static str) -> Result<&'a str, ParseError> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or(ParseError::MissingField(name))
    }
}

fn strip_visibility(value: &str) -> &str {
    value
        .strip_suffix(".public")
        .or_else(|| value.strip_suffix(".private"))
        .unwrap_or(value)
}

fn invalid(field: &str, value: &str) -> ParseError {
    ParseError::InvalidLiteral {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn unsigned<T: FromStr>(field: &str, value: &str, suffix: &str) -> Result<T, ParseError> {
    let value = strip_visibility(value);
    let digits = value
        .strip_suffix(suffix)
        .ok_or_else(|| invalid(field, value))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, value));
    }

    digits.parse::<T>().map_err(|_| ParseError::Overflow {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn boolean(field: &str, value: &str) -> Result<bool, ParseError> {
    match strip_visibility(value) {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(field, other)),
    }
}

fn address(field: &str, value: &str) -> Result<String, ParseError> {
    let value = strip_visibility(value);
    if value.len() > ADDRESS_PREFIX.len() && value.starts_with(ADDRESS_PREFIX) {
        Ok(value.to_string())
    } else {
        Err(invalid(field, value))
    }
}

pub fn parse_market_info(text: &str) -> Result<MarketInfo, ParseError> {
    let normalized = normalize(text);
    let fields = Fields::parse(&normalized)?;

    let creator = address("creator", fields.take("creator")?)?;
    let resolution_height =
        unsigned::<u32>("resolution_height", fields.take("resolution_height")?, "u32")?;
    let resolved = boolean("resolved", fields.take("resolved")?)?;

    let raw_outcome = fields.take("winning_outcome")?;
    let winning_outcome = unsigned::<u8>("winning_outcome", raw_outcome, "u8")?;
    if winning_outcome > 1 {
        return Err(invalid("winning_outcome", raw_outcome));
    }

    Ok(MarketInfo {
        creator,
        resolution_height,
        resolved,
        winning_outcome,
    })
}

pub fn parse_pool_state(text: &str) -> Result<PoolState, ParseError> {
    let normalized = normalize(text);
    let fields = Fields::parse(&normalized)?;

    let total_yes = unsigned::<u64>("total_yes", fields.take("total_yes")?, "u64")?;
    let total_no = unsigned::<u64>("total_no", fields.take("total_no")?, "u64")?;
    let total_pool = unsigned::<u64>("total_pool", fields.take("total_pool")?, "u64")?;

    if total_yes.checked_add(total_no) != Some(total_pool) {
        return Err(ParseError::PoolMismatch {
            yes: total_yes,
            no: total_no,
            pool: total_pool,
        });
    }

    Ok(PoolState {
        total_yes,
        total_no,
        total_pool,
    })
}

/// Reads a bare `<n>u64` scalar such as the `market_count` value.
pub fn parse_u64_literal(field: &str, text: &str) -> Result<u64, ParseError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(ParseError::Empty);
    }
    unsigned::<u64>(field, &normalized, "u64")
}

/// Reads a bare `<n>field` scalar and returns its decimal digits.
pub fn parse_field_literal(field: &str, text: &str) -> Result<String, ParseError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(ParseError::Empty);
    }
    let value = strip_visibility(&normalized);
    let digits = value
        .strip_suffix("field")
        .ok_or_else(|| invalid(field, value))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, value));
    }
    Ok(digits.to_string())
}
