//! Configuration module for the token watcher
//!
//! Loaded once from environment key/value settings and shared read-only.
//! Defaults live in utils/constants.rs.

use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{
    build_alchemy_ws_url, get_chain_id, mask_url, DEFAULT_MAX_CONCURRENT_CANDIDATES,
    DEFAULT_NETWORKS, DEFAULT_PERSIST_MAX_ATTEMPTS, DEFAULT_SCORER_ARGS, DEFAULT_SCORER_COMMAND,
    DEFAULT_SCORER_TIMEOUT_SECS, DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_STATS_INTERVAL_SECS,
    DEFAULT_TOKEN_TABLE,
};

/// One monitored network. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Unique network identifier, also the `blockchain` column value
    pub name: String,
    /// Websocket endpoint (may embed credentials, never log unmasked)
    pub ws_url: String,
    /// Logical chain selector checked at startup
    pub expected_chain_id: Option<u64>,
}

impl NetworkConfig {
    /// Endpoint safe for logs
    pub fn masked_url(&self) -> String {
        mask_url(&self.ws_url)
    }
}

/// External risk scorer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

/// PostgREST endpoint for the token table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
}

/// Configuration for the whole watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Networks with a resolvable endpoint
    pub networks: Vec<NetworkConfig>,
    /// `None` disables risk scoring
    pub scorer: Option<ScorerConfig>,
    /// `None` selects the in-memory store (dry run)
    pub store: Option<StoreConfig>,
    /// Per-network bound on in-flight candidate tasks
    pub max_concurrent_candidates: usize,
    /// Attempts per record for retryable store failures
    pub persist_max_attempts: u32,
    /// Time in-flight candidates get after the termination signal
    pub shutdown_grace: Duration,
    /// Period of statistics log lines
    pub stats_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            scorer: None,
            store: None,
            max_concurrent_candidates: DEFAULT_MAX_CONCURRENT_CANDIDATES,
            persist_max_attempts: DEFAULT_PERSIST_MAX_ATTEMPTS,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            stats_interval: Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS),
        }
    }
}

impl WatcherConfig {
    /// Load from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let names: Vec<String> = get("WATCH_NETWORKS")
            .unwrap_or_else(|| DEFAULT_NETWORKS.to_string())
            .split(',')
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();

        if names.is_empty() {
            return Err(AppError::new(
                ErrorCode::ConfigNoNetworks,
                "WATCH_NETWORKS lists no networks",
            ));
        }

        let alchemy_key = get("ALCHEMY_API_KEY").filter(|k| k != "YOUR_API_KEY");

        let mut networks: Vec<NetworkConfig> = Vec::with_capacity(names.len());
        for name in names {
            if networks.iter().any(|n| n.name == name) {
                warn!("⚠️ Network {} listed twice, ignoring duplicate", name);
                continue;
            }

            let prefix = name.to_uppercase();
            let expected_chain_id = match get(&format!("{}_CHAIN_ID", prefix)) {
                Some(raw) => Some(parse_value::<u64>(&format!("{}_CHAIN_ID", prefix), &raw)?),
                None => get_chain_id(&name),
            };

            let ws_url = get(&format!("{}_WSS_URL", prefix)).or_else(|| {
                let key = alchemy_key.as_ref()?;
                build_alchemy_ws_url(expected_chain_id?, key)
            });

            match ws_url {
                Some(ws_url) => {
                    let network = NetworkConfig {
                        name,
                        ws_url,
                        expected_chain_id,
                    };
                    info!("🔧 Network {} -> {}", network.name, network.masked_url());
                    networks.push(network);
                }
                None => {
                    warn!(
                        "⚠️ [{}] No endpoint for network {} (set {}_WSS_URL or ALCHEMY_API_KEY), skipping",
                        ErrorCode::ConfigMissingEnv.as_str(),
                        name,
                        prefix
                    );
                }
            }
        }

        let scorer = match lookup("RISK_SCORER_COMMAND") {
            Some(cmd) if cmd.trim().is_empty() => None,
            cmd => {
                let program = cmd
                    .map(|c| c.trim().to_string())
                    .unwrap_or_else(|| DEFAULT_SCORER_COMMAND.to_string());
                let args = get("RISK_SCORER_ARGS")
                    .unwrap_or_else(|| DEFAULT_SCORER_ARGS.to_string())
                    .split_whitespace()
                    .map(String::from)
                    .collect();
                let timeout_secs = get_parsed(&get, "RISK_SCORER_TIMEOUT_SECS", DEFAULT_SCORER_TIMEOUT_SECS)?;
                Some(ScorerConfig {
                    program,
                    args,
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
        };

        let store = match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(base_url), Some(api_key)) => Some(StoreConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                table: get("SUPABASE_TABLE").unwrap_or_else(|| DEFAULT_TOKEN_TABLE.to_string()),
            }),
            (Some(_), None) => return Err(AppError::missing_env("SUPABASE_KEY")),
            (None, Some(_)) => return Err(AppError::missing_env("SUPABASE_URL")),
            (None, None) => None,
        };

        let max_concurrent_candidates = get_parsed(
            &get,
            "MAX_CONCURRENT_CANDIDATES",
            DEFAULT_MAX_CONCURRENT_CANDIDATES,
        )?;
        if max_concurrent_candidates == 0 {
            return Err(AppError::invalid_config("MAX_CONCURRENT_CANDIDATES", "0"));
        }

        let persist_max_attempts =
            get_parsed(&get, "PERSIST_MAX_ATTEMPTS", DEFAULT_PERSIST_MAX_ATTEMPTS)?.max(1);
        let shutdown_grace_secs = get_parsed(&get, "SHUTDOWN_GRACE_SECS", DEFAULT_SHUTDOWN_GRACE_SECS)?;
        let stats_interval_secs =
            get_parsed(&get, "STATS_INTERVAL_SECS", DEFAULT_STATS_INTERVAL_SECS)?.max(1);

        Ok(Self {
            networks,
            scorer,
            store,
            max_concurrent_candidates,
            persist_max_attempts,
            shutdown_grace: Duration::from_secs(shutdown_grace_secs),
            stats_interval: Duration::from_secs(stats_interval_secs),
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.parse::<T>()
        .map_err(|_| AppError::invalid_config(key, raw))
}

fn get_parsed<T, G>(get: &G, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
