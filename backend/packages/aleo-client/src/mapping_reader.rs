use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};

use crate::block_height::HeightSource;
use crate::config::AleoConfig;
use crate::error::ChainError;

/// Exact-key reads against a program mapping.
///
/// `None` covers both "no such key" and "the read failed"; composed
/// components skip the entry either way. Reads are never retried here.
#[async_trait]
pub trait MappingSource: Send + Sync {
    async fn read(&self, mapping: &str, key: &str) -> Option<String>;
}

#[derive(Clone)]
pub struct AleoRpcClient {
    http: Client,
    config: AleoConfig,
}

impl AleoRpcClient {
    pub fn new(config: AleoConfig) -> Result<Self, ChainError> {
        let http = Client::builder()
            .user_agent(concat!("market-indexer/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ChainError::Transport {
                url: config.rpc_url.clone(),
                source,
            })?;
        Ok(Self { http, config })
    }

    pub async fn fetch_mapping(&self, mapping: &str, key: &str) -> Result<Option<String>, ChainError> {
        let url = self.config.mapping_url(mapping, key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ChainError::Transport {
                url: url.clone(),
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ChainError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ChainError::Transport { url, source })?;

        Ok(interpret_body(&body))
    }

    pub async fn fetch_latest_height(&self) -> Result<u64, ChainError> {
        let url = self.config.latest_height_url();
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ChainError::Transport {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ChainError::Transport { url, source })?;

        parse_height(&body)
    }
}

/// The node answers unknown keys with 404 or with a literal `null`.
fn interpret_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_height(body: &str) -> Result<u64, ChainError> {
    let trimmed = body.trim().trim_matches('"');
    trimmed
        .parse::<u64>()
        .map_err(|_| ChainError::Body(format!("expected block height, got `{}`", trimmed)))
}

#[async_trait]
impl MappingSource for AleoRpcClient {
    async fn read(&self, mapping: &str, key: &str) -> Option<String> {
        match self.fetch_mapping(mapping, key).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!("Mapping {}[{}] not found", mapping, key);
                None
            }
            Err(e) => {
                warn!("Error reading mapping {}[{}]: {}", mapping, key, e);
                None
            }
        }
    }
}

#[async_trait]
impl HeightSource for AleoRpcClient {
    async fn latest_height(&self) -> Result<u64, ChainError> {
        self.fetch_latest_height().await
    }
}
