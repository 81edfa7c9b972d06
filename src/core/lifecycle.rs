//! Lifecycle Controller
//!
//! Startup: connect and validate every configured network; a network that fails
//! is reported and left out, the rest keep going. Then one pipeline per network
//! runs until the termination signal, which is fanned out over a watch channel.

use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::core::persister::{Persister, TokenStore};
use crate::core::pipeline::{NetworkPipeline, PipelineSettings};
use crate::core::risk_bridge::RiskScorer;
use crate::core::stats::StatsSnapshot;
use crate::models::config::{NetworkConfig, WatcherConfig};
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::ChainIdentity;
use crate::providers::chain::ChainClient;
use crate::utils::constants::get_chain_name;

/// A network with a live client
#[derive(Clone)]
pub struct ConnectedNetwork {
    pub config: NetworkConfig,
    pub client: Arc<dyn ChainClient>,
}

/// Final statistics of one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReport {
    pub network: String,
    pub stats: StatsSnapshot,
}

/// Connect every network concurrently. A connection that fails or does not
/// complete within `timeout` is logged and excluded.
pub async fn connect_networks<F, Fut>(
    networks: &[NetworkConfig],
    timeout: Duration,
    connector: F,
) -> Vec<ConnectedNetwork>
where
    F: Fn(NetworkConfig) -> Fut,
    Fut: Future<Output = AppResult<Arc<dyn ChainClient>>>,
{
    let attempts = networks.iter().map(|network| {
        let pending = connector(network.clone());
        async move {
            let outcome = match tokio::time::timeout(timeout, pending).await {
                Ok(result) => result,
                Err(_) => Err(AppError::new(
                    ErrorCode::RpcTimeout,
                    format!("{}: no connection after {:?}", network.name, timeout),
                )),
            };
            (network, outcome)
        }
    });

    let mut connected = Vec::with_capacity(networks.len());
    for (network, outcome) in join_all(attempts).await {
        match outcome {
            Ok(client) => connected.push(ConnectedNetwork {
                config: network.clone(),
                client,
            }),
            Err(e) => error!("❌ [{}] Connection failed, network excluded: {}", network.name, e),
        }
    }
    connected
}

/// Fetch chain identity and check it against the configured chain id
pub async fn validate_network(network: &NetworkConfig, client: &dyn ChainClient) -> AppResult<ChainIdentity> {
    let identity = client.chain_identity().await?;

    if let Some(expected) = network.expected_chain_id {
        if identity.chain_id != expected {
            return Err(AppError::new(
                ErrorCode::ChainIdMismatch,
                format!(
                    "{}: node reports chain {} but {} is configured",
                    network.name, identity.chain_id, expected
                ),
            ));
        }
    }

    info!(
        "✅ [{}] Verified: chain {} ({}), latest block {}",
        network.name,
        identity.chain_id,
        get_chain_name(identity.chain_id),
        identity.latest_block
    );
    Ok(identity)
}

/// Runs the watcher across networks
pub struct LifecycleController {
    config: WatcherConfig,
    scorer: Arc<dyn RiskScorer>,
    store: Arc<dyn TokenStore>,
}

impl LifecycleController {
    pub fn new(config: WatcherConfig, scorer: Arc<dyn RiskScorer>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            config,
            scorer,
            store,
        }
    }

    /// Keep the networks that pass validation. Fails only if none do.
    pub async fn validate_all(&self, networks: Vec<ConnectedNetwork>) -> AppResult<Vec<ConnectedNetwork>> {
        let total = networks.len();
        let mut healthy = Vec::with_capacity(total);

        for network in networks {
            match validate_network(&network.config, network.client.as_ref()).await {
                Ok(_) => healthy.push(network),
                Err(e) => error!(
                    "❌ [{}] Validation failed, network excluded: {}",
                    network.config.name, e
                ),
            }
        }

        if healthy.is_empty() {
            return Err(AppError::new(
                ErrorCode::ConfigNoNetworks,
                format!("none of {} configured network(s) passed validation", total),
            ));
        }

        info!("🌐 {}/{} network(s) ready", healthy.len(), total);
        Ok(healthy)
    }

    /// Validate, run one pipeline per network, stop on `signal`.
    /// Returns when every pipeline has drained.
    pub async fn run<S>(&self, networks: Vec<ConnectedNetwork>, signal: S) -> AppResult<Vec<NetworkReport>>
    where
        S: Future<Output = ()>,
    {
        let networks = self.validate_all(networks).await?;
        let settings = PipelineSettings::from(&self.config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut pipelines = JoinSet::new();
        for network in networks {
            let name = network.config.name.clone();
            let pipeline = NetworkPipeline::new(
                name.clone(),
                network.client,
                self.scorer.clone(),
                Persister::new(self.store.clone(), self.config.persist_max_attempts),
                settings,
            );
            let rx = shutdown_rx.clone();
            pipelines.spawn(async move { (name, pipeline.run(rx).await) });
        }
        drop(shutdown_rx);

        let mut reports = Vec::new();
        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("🛑 Shutdown signal received, closing subscriptions...");
                    let _ = shutdown_tx.send(true);
                    break;
                }
                joined = pipelines.join_next() => match joined {
                    Some(joined) => collect(joined, &mut reports),
                    None => {
                        warn!("⚠️ All pipelines stopped");
                        break;
                    }
                }
            }
        }

        while let Some(joined) = pipelines.join_next().await {
            collect(joined, &mut reports);
        }

        info!("👋 Watcher stopped");
        Ok(reports)
    }
}

fn collect(
    joined: Result<(String, AppResult<StatsSnapshot>), tokio::task::JoinError>,
    reports: &mut Vec<NetworkReport>,
) {
    match joined {
        Ok((network, Ok(stats))) => reports.push(NetworkReport { network, stats }),
        Ok((network, Err(e))) => error!("❌ [{}] Pipeline failed: {}", network, e),
        Err(e) => error!("❌ Pipeline task aborted: {}", e),
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("❌ Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
