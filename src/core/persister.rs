//! Persister
//!
//! Idempotent storage of token records keyed by (contract_address, blockchain).
//! Transient store failures are retried with exponential backoff and jitter;
//! anything else, or running out of attempts, drops the record with an error log.

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::models::errors::AppResult;
use crate::models::types::TokenRecord;
use crate::utils::constants::{PERSIST_BASE_RETRY_MS, PERSIST_MAX_RETRY_MS, RETRY_JITTER_PERCENT};

/// Upsert-by-key storage backend
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert, or update the row with the same (contract_address, blockchain)
    async fn upsert(&self, record: &TokenRecord) -> AppResult<()>;
}

/// Process-local store for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: DashMap<(String, String), TokenRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for an address (any case) on a network
    pub fn get(&self, contract_address: &str, blockchain: &str) -> Option<TokenRecord> {
        self.rows
            .get(&(contract_address.to_lowercase(), blockchain.to_string()))
            .map(|row| row.value().clone())
    }

    pub fn records(&self) -> Vec<TokenRecord> {
        self.rows.iter().map(|row| row.value().clone()).collect()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn upsert(&self, record: &TokenRecord) -> AppResult<()> {
        self.rows.insert(record.key(), record.clone());
        Ok(())
    }
}

/// Saves records through a store with bounded retries
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn TokenStore>,
    max_attempts: u32,
    base_delay_ms: u64,
}

impl Persister {
    pub fn new(store: Arc<dyn TokenStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
            base_delay_ms: PERSIST_BASE_RETRY_MS,
        }
    }

    /// Override the first retry delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(PERSIST_MAX_RETRY_MS);
        self
    }

    /// Upsert one record. Failures are logged here; the caller only needs the
    /// outcome for bookkeeping.
    pub async fn save(&self, record: &TokenRecord) -> AppResult<()> {
        let mut attempt = 1;
        loop {
            match self.store.upsert(record).await {
                Ok(()) => {
                    info!(
                        "💾 [{}] Stored {} ({})",
                        record.blockchain, record.contract_address, record.symbol
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.retry_delay(attempt);
                    warn!(
                        "⏳ [{}] Store attempt {}/{} for {} failed: {}, retrying in {}ms",
                        record.blockchain,
                        attempt,
                        self.max_attempts,
                        record.contract_address,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "❌ [{}] Dropping {} after {} attempt(s): {}",
                        record.blockchain, record.contract_address, attempt, e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Exponential backoff with ±jitter, never below 1ms
    fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(PERSIST_MAX_RETRY_MS);
        let jitter_range = (base * RETRY_JITTER_PERCENT / 100) as i64;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0
        };
        let delay = (base as i64 + jitter).max(1) as u64;
        debug!("Store retry delay {}ms (base {}ms)", delay, base);
        Duration::from_millis(delay)
    }
}
