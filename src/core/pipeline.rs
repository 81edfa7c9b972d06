//! Network Pipeline
//!
//! One per watched network. The intake loop reads new block numbers, extracts
//! candidates and deduplicates them in arrival order; every surviving candidate
//! becomes its own task (ERC20 probe -> risk scoring -> record -> store), limited
//! by a per-network semaphore so bursts never spawn unbounded scorer processes.
//!
//! ```text
//! subscription ─► block ─► candidates ─► dedup ─┬─► task ─► verify ─► score ─► store
//!                                               └─► task ─► ...
//! ```

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::block_processor;
use crate::core::dedup::DedupTracker;
use crate::core::erc20;
use crate::core::persister::Persister;
use crate::core::record;
use crate::core::risk_bridge::RiskScorer;
use crate::core::stats::{PipelineStats, StatsSnapshot};
use crate::models::config::WatcherConfig;
use crate::models::errors::AppResult;
use crate::models::types::{Candidate, TokenFacts};
use crate::providers::chain::{BlockStream, ChainClient};
use crate::utils::constants::{
    WS_MAX_RECONNECT_ATTEMPTS, WS_RECONNECT_BASE_MS, WS_RECONNECT_MAX_MS,
};

/// Per-network tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_concurrent_candidates: usize,
    pub shutdown_grace: Duration,
    pub stats_interval: Duration,
    pub reconnect_base: Duration,
}

impl From<&WatcherConfig> for PipelineSettings {
    fn from(config: &WatcherConfig) -> Self {
        Self {
            max_concurrent_candidates: config.max_concurrent_candidates,
            shutdown_grace: config.shutdown_grace,
            stats_interval: config.stats_interval,
            reconnect_base: Duration::from_millis(WS_RECONNECT_BASE_MS),
        }
    }
}

/// Everything a candidate task needs, shared read-only
struct CandidateWorker {
    network: String,
    client: Arc<dyn ChainClient>,
    scorer: Arc<dyn RiskScorer>,
    persister: Persister,
    stats: Arc<PipelineStats>,
}

impl CandidateWorker {
    async fn handle(&self, candidate: Candidate) {
        let facts = match erc20::verify(self.client.as_ref(), candidate.contract_address).await {
            Ok(facts) => facts,
            Err(e) => {
                debug!(
                    "[{}] {} is not ERC20: {}",
                    self.network, candidate.contract_address, e
                );
                return;
            }
        };

        self.stats.token_detected();
        info!(
            "🪙 [{}] New ERC20 {} ({}) at {} | decimals={} | creator={} | block={} | tx={}",
            self.network,
            facts.name,
            facts.symbol,
            candidate.contract_address,
            facts.decimals,
            candidate.creator_address,
            candidate.block_number,
            candidate.transaction_hash
        );

        let verdict = self
            .scorer
            .assess(&TokenFacts::new(&candidate, &facts))
            .await;

        let record = record::build(&candidate, &facts, verdict.as_ref());
        if let Some(risk) = &record.risk {
            self.stats.verdict_received();
            info!(
                "🔎 [{}] Verdict for {}: category={} fraud_type={}",
                self.network, candidate.contract_address, risk.risk_category, risk.fraud_type
            );
        }

        match self.persister.save(&record).await {
            Ok(()) => self.stats.record_persisted(),
            Err(_) => self.stats.persist_failed(),
        }
    }
}

/// Detection pipeline for one network
pub struct NetworkPipeline {
    network: String,
    worker: Arc<CandidateWorker>,
    dedup: DedupTracker,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
    settings: PipelineSettings,
}

impl NetworkPipeline {
    pub fn new(
        network: impl Into<String>,
        client: Arc<dyn ChainClient>,
        scorer: Arc<dyn RiskScorer>,
        persister: Persister,
        settings: PipelineSettings,
    ) -> Self {
        let network = network.into();
        Self {
            worker: Arc::new(CandidateWorker {
                network: network.clone(),
                client,
                scorer,
                persister,
                stats: Arc::new(PipelineStats::default()),
            }),
            dedup: DedupTracker::new(network.clone()),
            semaphore: Arc::new(Semaphore::new(settings.max_concurrent_candidates.max(1))),
            tasks: JoinSet::new(),
            network,
            settings,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.worker.stats.snapshot()
    }

    /// Candidate tasks not yet finished
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Fetch a block and launch a task for every new candidate in it.
    /// Returns the number of tasks launched.
    pub async fn handle_block(&mut self, number: u64) -> usize {
        let stats = &self.worker.stats;
        stats.block_received();

        let Some(candidates) =
            block_processor::process_block(&self.network, self.worker.client.as_ref(), number).await
        else {
            stats.block_skipped();
            return 0;
        };

        let mut launched = 0;
        for candidate in candidates {
            stats.candidate();
            if !self.dedup.should_process(candidate.contract_address) {
                stats.duplicate();
                debug!(
                    "[{}] {} already processed, skipping",
                    self.network, candidate.contract_address
                );
                continue;
            }

            let worker = self.worker.clone();
            let semaphore = self.semaphore.clone();
            self.tasks.spawn(async move {
                // Permit is taken inside the task so intake never waits on it
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                worker.handle(candidate).await;
            });
            launched += 1;
        }
        launched
    }

    /// Wait for every in-flight candidate task
    pub async fn wait_idle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.reap(joined);
        }
    }

    fn reap(&self, joined: Result<(), tokio::task::JoinError>) {
        if let Err(e) = joined {
            if e.is_panic() {
                error!("❌ [{}] Candidate task panicked: {}", self.network, e);
            }
        }
    }

    /// Follow the network's block subscription until shutdown, or until the
    /// subscription is lost for good.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> AppResult<StatsSnapshot> {
        let mut stream = self.worker.client.subscribe_blocks().await?;
        info!("🔍 [{}] Listening for new blocks...", self.network);

        // interval() panics on a zero period
        let period = self.settings.stats_interval.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = stream.next() => match next {
                    Some(number) => {
                        self.handle_block(number).await;
                    }
                    None => {
                        warn!("⚠️ [{}] Block subscription ended", self.network);
                        match self.resubscribe(&mut shutdown).await {
                            Some(fresh) => stream = fresh,
                            None => break,
                        }
                    }
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.reap(joined);
                }
                _ = ticker.tick() => {
                    self.worker.stats.log(&self.network);
                }
            }
        }

        drop(stream);
        info!("🛑 [{}] Intake stopped, {} candidate task(s) in flight", self.network, self.tasks.len());
        self.drain().await;
        self.worker.stats.log(&self.network);
        Ok(self.stats())
    }

    /// Reopen the subscription with exponential backoff.
    /// `None` when shutdown arrives or attempts run out.
    async fn resubscribe(&mut self, shutdown: &mut watch::Receiver<bool>) -> Option<BlockStream> {
        for attempt in 1..=WS_MAX_RECONNECT_ATTEMPTS {
            let delay = reconnect_delay(self.settings.reconnect_base, attempt);
            info!(
                "🔄 [{}] Resubscribing in {}ms (attempt {}/{})",
                self.network,
                delay.as_millis(),
                attempt,
                WS_MAX_RECONNECT_ATTEMPTS
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return None,
            }

            match self.worker.client.subscribe_blocks().await {
                Ok(stream) => {
                    info!("✅ [{}] Resubscribed", self.network);
                    return Some(stream);
                }
                Err(e) => warn!("⚠️ [{}] Resubscribe failed: {}", self.network, e),
            }
        }

        error!(
            "❌ [{}] Giving up after {} resubscribe attempts",
            self.network, WS_MAX_RECONNECT_ATTEMPTS
        );
        None
    }

    /// Give in-flight tasks the grace period, then abort the rest
    async fn drain(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let grace = self.settings.shutdown_grace;
        info!(
            "⏳ [{}] Waiting up to {:?} for {} candidate task(s)",
            self.network,
            grace,
            self.in_flight()
        );
        if tokio::time::timeout(grace, self.wait_idle()).await.is_err() {
            warn!(
                "⚠️ [{}] Aborting {} candidate task(s) after {:?} grace",
                self.network,
                self.in_flight(),
                grace
            );
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }
    }
}

/// Backoff for the n-th resubscribe attempt (1-based)
pub fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = base.saturating_mul(1u32 << exponent);
    delay.min(Duration::from_millis(WS_RECONNECT_MAX_MS))
}
