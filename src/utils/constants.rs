//! Constants Module - Single Source of Truth
//!
//! Network names, chain ids, provider subdomains and default tunables.
//! Other modules read these instead of hardcoding values.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "TokenSentinel";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = "TokenSentinel/0.1.0";

// ============================================
// CHAIN IDS
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// Polygon
pub const CHAIN_ID_POLYGON: u64 = 137;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Optimism
pub const CHAIN_ID_OPTIMISM: u64 = 10;
/// Avalanche C-Chain
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;

/// Networks with built-in metadata (name, chain id)
pub const KNOWN_NETWORKS: [(&str, u64); 7] = [
    ("ethereum", CHAIN_ID_ETHEREUM),
    ("bsc", CHAIN_ID_BSC),
    ("polygon", CHAIN_ID_POLYGON),
    ("arbitrum", CHAIN_ID_ARBITRUM),
    ("optimism", CHAIN_ID_OPTIMISM),
    ("avalanche", CHAIN_ID_AVALANCHE),
    ("base", CHAIN_ID_BASE),
];

// ============================================
// RPC CONSTANTS
// ============================================

/// Timeout for a single node request (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

// ============================================
// PIPELINE DEFAULTS
// ============================================

/// Networks watched when `WATCH_NETWORKS` is unset
pub const DEFAULT_NETWORKS: &str = "ethereum";

/// Per-network bound on in-flight candidate tasks
pub const DEFAULT_MAX_CONCURRENT_CANDIDATES: usize = 8;

/// Risk scorer program and arguments
pub const DEFAULT_SCORER_COMMAND: &str = "python3";
pub const DEFAULT_SCORER_ARGS: &str = "risk_assessment_bridge.py";

/// Risk scorer round-trip timeout (seconds)
pub const DEFAULT_SCORER_TIMEOUT_SECS: u64 = 30;

/// Persistence table
pub const DEFAULT_TOKEN_TABLE: &str = "tokens";

/// Natural key of the token table
pub const TOKEN_CONFLICT_COLUMNS: &str = "contract_address,blockchain";

/// Attempts per record for retryable store failures
pub const DEFAULT_PERSIST_MAX_ATTEMPTS: u32 = 3;

/// Base delay between store retries (milliseconds)
pub const PERSIST_BASE_RETRY_MS: u64 = 500;

/// Cap on store retry delay (milliseconds)
pub const PERSIST_MAX_RETRY_MS: u64 = 8000;

/// Jitter percentage applied to store retry delays
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Store request timeout (seconds)
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Grace period for in-flight candidates after shutdown (seconds)
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Stats log period (seconds)
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 60;

// ============================================
// SUBSCRIPTION RECONNECT
// ============================================

/// Reconnection base delay (milliseconds)
pub const WS_RECONNECT_BASE_MS: u64 = 1000;

/// Maximum reconnection delay (milliseconds)
pub const WS_RECONNECT_MAX_MS: u64 = 30000;

/// Maximum consecutive resubscribe attempts before a network is given up
pub const WS_MAX_RECONNECT_ATTEMPTS: u32 = 10;

// ============================================
// NETWORK MAPPING
// ============================================

/// Get chain id for a known network name
pub fn get_chain_id(network: &str) -> Option<u64> {
    let network = network.to_lowercase();
    KNOWN_NETWORKS
        .iter()
        .find(|(name, _)| *name == network)
        .map(|(_, id)| *id)
}

/// Get Alchemy subdomain for a chain
pub fn get_alchemy_subdomain(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("eth-mainnet"),
        CHAIN_ID_BSC => Some("bnb-mainnet"),
        CHAIN_ID_POLYGON => Some("polygon-mainnet"),
        CHAIN_ID_ARBITRUM => Some("arb-mainnet"),
        CHAIN_ID_OPTIMISM => Some("opt-mainnet"),
        CHAIN_ID_AVALANCHE => Some("avax-mainnet"),
        CHAIN_ID_BASE => Some("base-mainnet"),
        _ => None,
    }
}

/// Build Alchemy websocket URL for a chain
pub fn build_alchemy_ws_url(chain_id: u64, api_key: &str) -> Option<String> {
    get_alchemy_subdomain(chain_id)
        .map(|subdomain| format!("wss://{}.g.alchemy.com/v2/{}", subdomain, api_key))
}

/// Get display name for a chain
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_BSC => "BNB Smart Chain",
        CHAIN_ID_POLYGON => "Polygon",
        CHAIN_ID_ARBITRUM => "Arbitrum One",
        CHAIN_ID_OPTIMISM => "Optimism",
        CHAIN_ID_AVALANCHE => "Avalanche C-Chain",
        CHAIN_ID_BASE => "Base",
        _ => "Unknown",
    }
}

/// Mask the credential part of a provider URL for logging
pub fn mask_url(url: &str) -> String {
    if let Some((base, _)) = url.split_once("/v2/") {
        return format!("{}/v2/***HIDDEN***", base);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_network_lookup() {
        assert_eq!(get_chain_id("ethereum"), Some(1));
        assert_eq!(get_chain_id("Base"), Some(8453));
        assert_eq!(get_chain_id("fantom"), None);
    }

    #[test]
    fn test_alchemy_ws_url() {
        let url = build_alchemy_ws_url(CHAIN_ID_POLYGON, "k3y").unwrap();
        assert_eq!(url, "wss://polygon-mainnet.g.alchemy.com/v2/k3y");
        assert!(build_alchemy_ws_url(999, "k3y").is_none());
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("wss://eth-mainnet.g.alchemy.com/v2/secret"),
            "wss://eth-mainnet.g.alchemy.com/v2/***HIDDEN***"
        );
        assert_eq!(mask_url("ws://localhost:8546"), "ws://localhost:8546");
    }
}
