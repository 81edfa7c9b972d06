//! Token Sentinel Library
//!
//! Multi-network watcher for newly deployed ERC20 tokens:
//! - Follows new blocks on every configured network
//! - Picks out contract creations and probes them for name/symbol/decimals
//! - Scores each token with an external risk scorer
//! - Upserts one record per (contract, network)

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    DedupTracker, DisabledScorer, LifecycleController, MemoryStore, NetworkPipeline, Persister,
    PipelineSettings, RiskScorer, StatsSnapshot, SubprocessScorer, TokenStore,
};
pub use models::{AppError, AppResult, ErrorCode, NetworkConfig, RiskVerdict, TokenRecord, WatcherConfig};
pub use providers::{AlloyChainClient, BlockSource, ChainClient, ContractCaller, SupabaseStore};
