use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use aleo_client::MarketId;
use thiserror::Error;

use crate::types::PendingMarket;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PendingError {
    #[error("pending tracker lock poisoned")]
    Poisoned,
}

/// Markets created through this process that the chain may not list yet.
/// An entry is dropped as soon as its id shows up on-chain.
#[derive(Clone, Default)]
pub struct LocalPendingTracker {
    inner: Arc<RwLock<Vec<PendingMarket>>>,
}

impl LocalPendingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id is already tracked.
    pub fn track(&self, market: PendingMarket) -> Result<bool, PendingError> {
        let mut guard = self.inner.write().map_err(|_| PendingError::Poisoned)?;

        if guard.iter().any(|m| m.id == market.id) {
            return Ok(false);
        }
        guard.push(market);
        Ok(true)
    }

    pub fn list(&self) -> Vec<PendingMarket> {
        self.inner.read().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn get(&self, id: &MarketId) -> Option<PendingMarket> {
        self.inner.read().ok()?.iter().find(|m| &m.id == id).cloned()
    }

    /// Removes every entry whose id is confirmed and returns how many went.
    pub fn supersede(&self, confirmed: &HashSet<MarketId>) -> Result<usize, PendingError> {
        let mut guard = self.inner.write().map_err(|_| PendingError::Poisoned)?;

        let before = guard.len();
        guard.retain(|m| !confirmed.contains(&m.id));
        Ok(before - guard.len())
    }

}
