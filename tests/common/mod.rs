//! Shared fixtures: an in-memory chain client, token contracts and scorers

#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use token_sentinel::models::types::{BlockData, BlockTransaction, ChainIdentity, TokenFacts};
use token_sentinel::providers::chain::{BlockSource, BlockStream, ContractCaller};
use token_sentinel::{AppError, AppResult, ErrorCode, RiskScorer, RiskVerdict};

pub const NAME_SELECTOR: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];
pub const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];
pub const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// ABI encoding of a single `string` return value
pub fn abi_string(value: &str) -> Bytes {
    let mut out = U256::from(32).to_be_bytes::<32>().to_vec();
    out.extend_from_slice(&U256::from(value.len()).to_be_bytes::<32>());
    out.extend_from_slice(value.as_bytes());
    out.resize(64 + value.len().div_ceil(32) * 32, 0);
    Bytes::from(out)
}

/// ABI encoding of a single integer return value
pub fn abi_word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

/// Transaction deploying `creates`, or a plain call when `None`
pub fn tx(n: u8, creates: Option<Address>) -> BlockTransaction {
    BlockTransaction {
        hash: B256::repeat_byte(n),
        from: Address::repeat_byte(0xc0),
        creates,
    }
}

pub fn block(number: u64, transactions: Vec<BlockTransaction>) -> BlockData {
    BlockData {
        number,
        timestamp: 1_700_000_000 + number * 12,
        transactions,
    }
}

/// In-memory node: fixed blocks, contracts answering by selector, and
/// subscriptions fed through channels
pub struct MockChain {
    identity: Mutex<AppResult<ChainIdentity>>,
    blocks: Mutex<HashMap<u64, BlockData>>,
    contracts: Mutex<HashMap<Address, HashMap<[u8; 4], Bytes>>>,
    subscriptions: Mutex<VecDeque<mpsc::UnboundedReceiver<u64>>>,
    calls: Mutex<HashMap<Address, usize>>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            identity: Mutex::new(Ok(ChainIdentity {
                chain_id,
                latest_block: 19_000_000,
            })),
            blocks: Mutex::new(HashMap::new()),
            contracts: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(VecDeque::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Node that cannot answer identity requests
    pub fn unreachable() -> Self {
        let chain = Self::new(0);
        *chain.identity.lock().unwrap() = Err(AppError::rpc_connection_failed("connection refused"));
        chain
    }

    pub fn add_block(&self, block: BlockData) {
        self.blocks.lock().unwrap().insert(block.number, block);
    }

    /// Contract implementing the ERC20 metadata reads
    pub fn add_token(&self, address: Address, name: &str, symbol: &str, decimals: U256) {
        let mut answers = HashMap::new();
        answers.insert(NAME_SELECTOR, abi_string(name));
        answers.insert(SYMBOL_SELECTOR, abi_string(symbol));
        answers.insert(DECIMALS_SELECTOR, abi_word(decimals));
        self.contracts.lock().unwrap().insert(address, answers);
    }

    /// Contract with arbitrary answers; missing selectors revert
    pub fn add_contract(&self, address: Address, answers: HashMap<[u8; 4], Bytes>) {
        self.contracts.lock().unwrap().insert(address, answers);
    }

    /// Queue a subscription; the returned sender feeds it
    pub fn subscription(&self) -> mpsc::UnboundedSender<u64> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions.lock().unwrap().push_back(rx);
        tx
    }

    /// `eth_call`s made against an address
    pub fn calls_to(&self, address: Address) -> usize {
        self.calls.lock().unwrap().get(&address).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl BlockSource for MockChain {
    async fn chain_identity(&self) -> AppResult<ChainIdentity> {
        match &*self.identity.lock().unwrap() {
            Ok(identity) => Ok(*identity),
            Err(e) => Err(AppError::new(e.code, e.message.clone())),
        }
    }

    async fn block_with_transactions(&self, number: u64) -> AppResult<Option<BlockData>> {
        Ok(self.blocks.lock().unwrap().get(&number).cloned())
    }

    async fn subscribe_blocks(&self) -> AppResult<BlockStream> {
        let rx = self
            .subscriptions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::new(ErrorCode::RpcSubscriptionFailed, "no subscription"))?;

        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|n| (n, rx)) }).boxed())
    }
}

#[async_trait]
impl ContractCaller for MockChain {
    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes> {
        *self.calls.lock().unwrap().entry(to).or_insert(0) += 1;

        if data.len() < 4 {
            return Err(AppError::call_failed("execution reverted"));
        }
        let selector = [data[0], data[1], data[2], data[3]];

        match self.contracts.lock().unwrap().get(&to) {
            // No code at the address: the call succeeds with empty output
            None => Ok(Bytes::new()),
            Some(answers) => answers
                .get(&selector)
                .cloned()
                .ok_or_else(|| AppError::call_failed("execution reverted")),
        }
    }
}

/// Scorer returning a fixed verdict and recording what it was asked
pub struct FixedScorer {
    verdict: Option<serde_json::Value>,
    delay: Duration,
    pub requests: Mutex<Vec<TokenFacts>>,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
}

impl FixedScorer {
    pub fn new(verdict: Option<serde_json::Value>) -> Self {
        Self {
            verdict,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl RiskScorer for FixedScorer {
    async fn assess(&self, facts: &TokenFacts) -> Option<RiskVerdict> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().unwrap().push(facts.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.verdict.clone().and_then(RiskVerdict::from_value)
    }
}

/// Poll `check` until it holds or the timeout elapses
pub async fn eventually<F: Fn() -> bool>(check: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
