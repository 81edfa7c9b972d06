//! Per-network pipeline statistics

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Thread-safe counters, shared between the intake loop and candidate tasks
#[derive(Debug, Default)]
pub struct PipelineStats {
    blocks_received: AtomicU64,
    blocks_skipped: AtomicU64,
    candidates: AtomicU64,
    duplicates: AtomicU64,
    tokens_detected: AtomicU64,
    verdicts_received: AtomicU64,
    records_persisted: AtomicU64,
    persist_failures: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub blocks_received: u64,
    pub blocks_skipped: u64,
    pub candidates: u64,
    pub duplicates: u64,
    pub tokens_detected: u64,
    pub verdicts_received: u64,
    pub records_persisted: u64,
    pub persist_failures: u64,
}

impl PipelineStats {
    pub fn block_received(&self) {
        self.blocks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn block_skipped(&self) {
        self.blocks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn candidate(&self) {
        self.candidates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn token_detected(&self) {
        self.tokens_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn verdict_received(&self) {
        self.verdicts_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.records_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn persist_failed(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            blocks_received: self.blocks_received.load(Ordering::Relaxed),
            blocks_skipped: self.blocks_skipped.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            tokens_detected: self.tokens_detected.load(Ordering::Relaxed),
            verdicts_received: self.verdicts_received.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log(&self, network: &str) {
        let s = self.snapshot();
        info!(
            "📊 [{}] Blocks: {} (skipped {}) | Candidates: {} (dup {}) | Tokens: {} | Verdicts: {} | Stored: {} | Store failures: {}",
            network,
            s.blocks_received,
            s.blocks_skipped,
            s.candidates,
            s.duplicates,
            s.tokens_detected,
            s.verdicts_received,
            s.records_persisted,
            s.persist_failures
        );
    }
}
