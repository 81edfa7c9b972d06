//! Token Sentinel - multi-network ERC20 deployment watcher
//!
//! Configuration comes from the environment (see `WatcherConfig::from_env`).
//! Runs until Ctrl+C / SIGTERM.

use token_sentinel::core::{connect_networks, shutdown_signal};
use token_sentinel::providers::chain;
use token_sentinel::utils::constants::{APP_NAME, APP_VERSION, DEFAULT_RPC_TIMEOUT_SECS};
use token_sentinel::{
    DisabledScorer, LifecycleController, MemoryStore, RiskScorer, SubprocessScorer,
    SupabaseStore, TokenStore, WatcherConfig,
};

use eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("🚀 {} v{} starting", APP_NAME, APP_VERSION);

    // Load configuration
    let config = WatcherConfig::from_env()?;
    info!(
        "🔧 {} network(s) configured | max {} concurrent candidate(s) per network",
        config.networks.len(),
        config.max_concurrent_candidates
    );

    let scorer: Arc<dyn RiskScorer> = match &config.scorer {
        Some(scorer) => {
            info!("🐍 Risk scorer: {} {}", scorer.program, scorer.args.join(" "));
            Arc::new(SubprocessScorer::new(scorer.clone()))
        }
        None => {
            warn!("⚠️ RISK_SCORER_COMMAND is empty, tokens are stored without risk fields");
            Arc::new(DisabledScorer)
        }
    };

    let store: Arc<dyn TokenStore> = match &config.store {
        Some(store) => {
            info!("💾 Storing into table {} at {}", store.table, store.base_url);
            Arc::new(SupabaseStore::new(store)?)
        }
        None => {
            warn!("⚠️ SUPABASE_URL/SUPABASE_KEY not set, dry run with in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // Handshake bound plus slack for the connect call's own timeout
    let connect_timeout = Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS + 5);
    let networks = connect_networks(&config.networks, connect_timeout, |network| async move {
        chain::connect(&network).await
    })
    .await;

    let controller = LifecycleController::new(config, scorer, store);
    let reports = controller.run(networks, shutdown_signal()).await?;

    info!("📊 Final Statistics:");
    for report in reports {
        info!(
            "   {} | blocks {} | tokens {} | verdicts {} | stored {} | store failures {}",
            report.network,
            report.stats.blocks_received,
            report.stats.tokens_detected,
            report.stats.verdicts_received,
            report.stats.records_persisted,
            report.stats.persist_failures
        );
    }

    Ok(())
}
