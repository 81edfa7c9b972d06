//! Core Module - Detection and Enrichment Pipeline
//!
//! Block processing, deduplication, ERC20 probing, risk scoring, record
//! shaping, persistence and the per-network lifecycle around them.

pub mod block_processor;
pub mod dedup;
pub mod erc20;
pub mod lifecycle;
pub mod persister;
pub mod pipeline;
pub mod record;
pub mod risk_bridge;
pub mod stats;

pub use dedup::DedupTracker;
pub use lifecycle::{connect_networks, shutdown_signal, validate_network, ConnectedNetwork, LifecycleController, NetworkReport};
pub use persister::{MemoryStore, Persister, TokenStore};
pub use pipeline::{NetworkPipeline, PipelineSettings};
pub use risk_bridge::{DisabledScorer, RiskScorer, SubprocessScorer};
pub use stats::{PipelineStats, StatsSnapshot};
