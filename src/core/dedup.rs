//! Deduplication tracker
//!
//! One instance per network pipeline. Addresses are remembered for the life of
//! the process only; after a restart a contract may be processed again, which
//! the upsert store absorbs.

use alloy_primitives::Address;
use std::collections::HashSet;

/// Contract addresses already forwarded on one network
#[derive(Debug)]
pub struct DedupTracker {
    network: String,
    seen: HashSet<Address>,
}

impl DedupTracker {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            seen: HashSet::new(),
        }
    }

    /// Check-and-set: true on the first call for an address, false afterwards.
    /// `&mut self` makes the check and the mark one step for the owning pipeline.
    pub fn should_process(&mut self, address: Address) -> bool {
        self.seen.insert(address)
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
