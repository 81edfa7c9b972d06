//! Chain Access Module - Node Collaborator
//!
//! Everything the watcher needs from a node, behind two traits:
//! - `BlockSource`: chain identity, full blocks, new-block subscription
//! - `ContractCaller`: read-only `eth_call`
//!
//! `AlloyChainClient` implements both over one alloy websocket provider.

use alloy::pubsub::PubSubFrontend;
use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder, WsConnect};
use alloy_rpc_types::{
    BlockNumberOrTag, BlockTransactionsKind, TransactionInput, TransactionRequest,
    TransactionTrait,
};
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::config::NetworkConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{BlockData, BlockTransaction, ChainIdentity};
use crate::utils::constants::DEFAULT_RPC_TIMEOUT_SECS;

/// New block numbers in arrival order
pub type BlockStream = BoxStream<'static, u64>;

/// Block retrieval and subscription
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Chain id and latest block height
    async fn chain_identity(&self) -> AppResult<ChainIdentity>;

    /// Full block with transactions; `Ok(None)` when the node does not have it
    async fn block_with_transactions(&self, number: u64) -> AppResult<Option<BlockData>>;

    /// Stream of new block numbers. Dropping the stream closes the subscription.
    async fn subscribe_blocks(&self) -> AppResult<BlockStream>;
}

/// Read-only contract calls
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// `eth_call` against the latest block; reverts surface as errors
    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes>;
}

/// A full node connection
pub trait ChainClient: BlockSource + ContractCaller {}

impl<T: BlockSource + ContractCaller + ?Sized> ChainClient for T {}

/// Address deployed by a transaction: set only when the transaction has no recipient
pub fn created_contract(from: Address, to: Option<Address>, nonce: u64) -> Option<Address> {
    match to {
        Some(_) => None,
        None => Some(from.create(nonce)),
    }
}

/// Alloy websocket client for one network
pub struct AlloyChainClient<P> {
    network: String,
    provider: P,
    timeout: Duration,
}

/// Connect to a network's websocket endpoint
pub async fn connect(network: &NetworkConfig) -> AppResult<Arc<dyn ChainClient>> {
    connect_with_timeout(network, Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS)).await
}

/// Connect, giving up when the handshake takes longer than `timeout`.
/// The same bound then applies to every request on the client.
pub async fn connect_with_timeout(network: &NetworkConfig, timeout: Duration) -> AppResult<Arc<dyn ChainClient>> {
    info!("📡 [{}] Connecting to {}", network.name, network.masked_url());

    let ws = WsConnect::new(network.ws_url.clone());
    let provider = match tokio::time::timeout(timeout, ProviderBuilder::new().on_ws(ws)).await {
        Ok(Ok(provider)) => provider,
        Ok(Err(e)) => {
            return Err(AppError::rpc_connection_failed(format!(
                "{}: websocket connect to {} failed: {}",
                network.name,
                network.masked_url(),
                e
            )))
        }
        Err(_) => {
            return Err(AppError::new(
                ErrorCode::RpcTimeout,
                format!(
                    "{}: websocket connect to {} timed out after {:?}",
                    network.name,
                    network.masked_url(),
                    timeout
                ),
            ))
        }
    };

    Ok(Arc::new(AlloyChainClient {
        network: network.name.clone(),
        provider,
        timeout,
    }))
}

impl<P> AlloyChainClient<P> {
    async fn bounded<T, E, F>(&self, what: &str, fut: F) -> AppResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, fut.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::rpc(format!("{}: {} failed: {}", self.network, what, e))),
            Err(_) => Err(AppError::new(
                ErrorCode::RpcTimeout,
                format!("{}: {} timed out after {:?}", self.network, what, self.timeout),
            )),
        }
    }
}

#[async_trait]
impl<P> BlockSource for AlloyChainClient<P>
where
    P: Provider<PubSubFrontend> + Send + Sync + 'static,
{
    async fn chain_identity(&self) -> AppResult<ChainIdentity> {
        let chain_id = self.bounded("eth_chainId", self.provider.get_chain_id()).await?;
        let latest_block = self
            .bounded("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(ChainIdentity {
            chain_id,
            latest_block,
        })
    }

    async fn block_with_transactions(&self, number: u64) -> AppResult<Option<BlockData>> {
        let block = self
            .bounded(
                "eth_getBlockByNumber",
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Number(number), BlockTransactionsKind::Full),
            )
            .await?;

        let Some(block) = block else {
            return Ok(None);
        };

        let Some(txs) = block.transactions.as_transactions() else {
            debug!("[{}] Block {} returned without transaction bodies", self.network, number);
            return Ok(None);
        };

        let transactions = txs
            .iter()
            .map(|tx| BlockTransaction {
                hash: *tx.inner.tx_hash(),
                from: tx.from,
                creates: created_contract(
                    tx.from,
                    TransactionTrait::to(tx),
                    TransactionTrait::nonce(tx),
                ),
            })
            .collect();

        Ok(Some(BlockData {
            number,
            timestamp: block.header.timestamp,
            transactions,
        }))
    }

    async fn subscribe_blocks(&self) -> AppResult<BlockStream> {
        let sub = self.provider.subscribe_blocks().await.map_err(|e| {
            AppError::new(
                ErrorCode::RpcSubscriptionFailed,
                format!("{}: newHeads subscription failed: {}", self.network, e),
            )
        })?;

        Ok(sub.into_stream().map(|header| header.number).boxed())
    }
}

#[async_trait]
impl<P> ContractCaller for AlloyChainClient<P>
where
    P: Provider<PubSubFrontend> + Send + Sync + 'static,
{
    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes> {
        let request = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data));

        self.bounded("eth_call", self.provider.call(&request))
            .await
            .map_err(|e| match e.code {
                ErrorCode::RpcTimeout => e,
                _ => AppError::call_failed(e.message),
            })
    }
}
