//! Test doubles and fixtures.
//!
//! [`MockApi`] is a scripted [`SwapApi`]: swap events are served page by page
//! out of per-contract lists and every call is recorded, so tests can check
//! what the scraper asked for. [`TestStore`] wraps [`MemoryStore`] with
//! failure injection.
//!
//! Both are cheap to clone and clones share state, so a test can keep a
//! handle after moving the double into a [`crate::scraper::Scraper`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use alloy::primitives::U256;
use dashmap::{DashMap, DashSet};
use fastnum::{dec256, udec256};
use parking_lot::Mutex;

use crate::{
    error::{RpcError, StoreError},
    rpc::SwapApi,
    store::{CursorStore, MemoryStore, SwapCatalog},
    trade::Trade,
    types::{Asset, PollingCursor, RawSwapEvent, SwapRelation},
};

pub const BLOCKCHAIN: &str = "Alephium";

pub fn alph() -> Asset {
    Asset::new(
        "ALPH",
        "Alephium",
        "tgx7VNFoP9DJiFMFgXXtafQZkUvyEdDHT9ryamHJYrjq",
        18,
        BLOCKCHAIN,
    )
}

pub fn usdt() -> Asset {
    Asset::new(
        "USDT",
        "Tether USD",
        "zSRgc7goAYUgYsEBYdAzogyyeKv3ne3uvWb3VDtxnaEK",
        6,
        BLOCKCHAIN,
    )
}

/// ALPH/USDT relation of the `alph-usdt` contract.
pub fn alph_usdt() -> SwapRelation {
    relation("alph-usdt")
}

/// ALPH/USDT relation of the given contract.
pub fn relation(contract: &str) -> SwapRelation {
    SwapRelation::new(contract, alph(), usdt())
}

/// One ALPH sold for two USDT in the transaction.
pub fn trade(tx_hash: &str) -> Trade {
    Trade {
        time: 1_700_000_000_000,
        symbol: "ALPH-USDT".to_string(),
        pair: "ALPH-USDT".to_string(),
        price: udec256!(2),
        volume: dec256!(-1),
        foreign_trade_id: tx_hash.to_string(),
        source: "Ayin".to_string(),
        base_token: alph(),
        quote_token: usdt(),
        verified_pair: true,
    }
}

/// Integer amount scaled to the token decimals.
pub fn scale(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * U256::from(10).pow(U256::from(decimals))
}

/// Swap event selling `alph` ALPH for `usdt` USDT, both in whole tokens.
pub fn sell_alph(tx_hash: &str, alph: u64, usdt: u64) -> RawSwapEvent {
    let (alph, usdt) = (scale(alph, 18).to_string(), scale(usdt, 6).to_string());
    RawSwapEvent::from_values(tx_hash, &["sender", alph.as_str(), "0", "0", usdt.as_str()])
}

#[derive(Clone, Debug, Default)]
pub struct MockApi {
    inner: Arc<MockApiInner>,
}

#[derive(Debug, Default)]
struct MockApiInner {
    events: DashMap<String, Vec<RawSwapEvent>>,
    timestamps: DashMap<String, i64>,
    swap_contracts: Mutex<Vec<String>>,
    token_pairs: DashMap<String, [String; 2]>,
    tokens: DashMap<String, Asset>,
    failing_events: DashSet<String>,
    panicking_events: DashSet<String>,
    failing_txs: DashSet<String>,
    failing_token_pairs: DashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the event to the contract's event list.
    pub fn push_event(&self, contract: &str, event: RawSwapEvent, timestamp: i64) {
        self.inner
            .timestamps
            .insert(event.tx_hash.clone(), timestamp);
        self.inner
            .events
            .entry(contract.to_string())
            .or_default()
            .push(event);
    }

    pub fn fail_events(&self, contract: &str) {
        self.inner.failing_events.insert(contract.to_string());
    }

    /// Makes event fetches of the contract panic, taking the caller down.
    pub fn panic_on_events(&self, contract: &str) {
        self.inner.panicking_events.insert(contract.to_string());
    }

    pub fn fail_tx(&self, tx_hash: &str) {
        self.inner.failing_txs.insert(tx_hash.to_string());
    }

    /// Registers a swap contract trading the two assets for discovery.
    pub fn add_swap_contract(&self, contract: &str, asset0: Asset, asset1: Asset) {
        self.inner.swap_contracts.lock().push(contract.to_string());
        self.inner.token_pairs.insert(
            contract.to_string(),
            [asset0.address.clone(), asset1.address.clone()],
        );
        self.inner.tokens.insert(asset0.address.clone(), asset0);
        self.inner.tokens.insert(asset1.address.clone(), asset1);
    }

    pub fn fail_token_pair(&self, contract: &str) {
        self.inner.failing_token_pairs.insert(contract.to_string());
    }

    /// Calls made so far, e.g. `events:alph-usdt:1` or `tx:0xabc`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().clone()
    }

    /// Event pages requested so far, as `(contract, page)`.
    pub fn event_requests(&self) -> Vec<(String, u64)> {
        self.calls()
            .iter()
            .filter_map(|call| {
                let rest = call.strip_prefix("events:")?;
                let (contract, page) = rest.rsplit_once(':')?;
                Some((contract.to_string(), page.parse().ok()?))
            })
            .collect()
    }

    fn log(&self, call: String) {
        self.inner.calls.lock().push(call);
    }
}

fn not_found(what: &str) -> RpcError {
    RpcError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

impl SwapApi for MockApi {
    async fn swap_events(
        &self,
        contract: &str,
        limit: usize,
        page: u64,
    ) -> Result<Vec<RawSwapEvent>, RpcError> {
        self.log(format!("events:{contract}:{page}"));
        if self.inner.panicking_events.contains(contract) {
            panic!("scripted panic fetching events of {contract}");
        }
        if self.inner.failing_events.contains(contract) {
            return Err(RpcError::Transport("connection reset".to_string()));
        }
        let Some(events) = self.inner.events.get(contract) else {
            return Ok(Vec::new());
        };
        let start = (page.saturating_sub(1) as usize).saturating_mul(limit);
        Ok(events.iter().skip(start).take(limit).cloned().collect())
    }

    async fn transaction_timestamp(&self, tx_hash: &str) -> Result<i64, RpcError> {
        self.log(format!("tx:{tx_hash}"));
        if self.inner.failing_txs.contains(tx_hash) {
            return Err(RpcError::Timeout);
        }
        self.inner
            .timestamps
            .get(tx_hash)
            .map(|t| *t)
            .ok_or_else(|| not_found(tx_hash))
    }

    async fn swap_contract_addresses(&self, limit: usize) -> Result<Vec<String>, RpcError> {
        self.log(format!("contracts:{limit}"));
        Ok(self
            .inner
            .swap_contracts
            .lock()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn token_pair_addresses(&self, contract: &str) -> Result<[String; 2], RpcError> {
        self.log(format!("token_pair:{contract}"));
        if self.inner.failing_token_pairs.contains(contract) {
            return Err(RpcError::InvalidResponse("unexpected return values".to_string()));
        }
        self.inner
            .token_pairs
            .get(contract)
            .map(|p| p.clone())
            .ok_or_else(|| not_found(contract))
    }

    async fn token_info(&self, address: &str, _blockchain: &str) -> Result<Asset, RpcError> {
        self.log(format!("token:{address}"));
        self.inner
            .tokens
            .get(address)
            .map(|a| a.clone())
            .ok_or_else(|| not_found(address))
    }
}

/// [`MemoryStore`] with injectable failures.
#[derive(Clone, Debug, Default)]
pub struct TestStore {
    memory: MemoryStore,
    failing: Arc<Failures>,
}

#[derive(Debug, Default)]
struct Failures {
    catalog: AtomicBool,
    advance: AtomicBool,
    ensure: DashSet<String>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store tracking the relations on [`BLOCKCHAIN`].
    pub fn with_relations(relations: impl IntoIterator<Item = SwapRelation>) -> Self {
        let store = Self::new();
        for relation in relations {
            store.memory.insert_swap_relation(BLOCKCHAIN, relation);
        }
        store
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Current page of the contract on [`BLOCKCHAIN`].
    pub fn page(&self, contract: &str) -> Option<u64> {
        self.memory.page(contract, BLOCKCHAIN)
    }

    pub fn fail_catalog(&self, fail: bool) {
        self.failing.catalog.store(fail, Ordering::Release);
    }

    pub fn fail_advance(&self, fail: bool) {
        self.failing.advance.store(fail, Ordering::Release);
    }

    pub fn fail_ensure(&self, contract: &str) {
        self.failing.ensure.insert(contract.to_string());
    }
}

fn backend_error() -> StoreError {
    StoreError::Backend("injected failure".to_string())
}

impl SwapCatalog for TestStore {
    async fn swap_relations(&self, blockchain: &str) -> Result<Vec<SwapRelation>, StoreError> {
        if self.failing.catalog.load(Ordering::Acquire) {
            return Err(backend_error());
        }
        self.memory.swap_relations(blockchain).await
    }
}

impl CursorStore for TestStore {
    async fn ensure_cursor(&self, cursor: &PollingCursor) -> Result<(), StoreError> {
        if self.failing.ensure.contains(&cursor.contract) {
            return Err(backend_error());
        }
        self.memory.ensure_cursor(cursor).await
    }

    async fn cursor(&self, contract: &str, blockchain: &str) -> Result<PollingCursor, StoreError> {
        self.memory.cursor(contract, blockchain).await
    }

    async fn advance_cursor(
        &self,
        contract: &str,
        blockchain: &str,
        page: u64,
    ) -> Result<(), StoreError> {
        if self.failing.advance.load(Ordering::Acquire) {
            return Err(backend_error());
        }
        self.memory.advance_cursor(contract, blockchain, page).await
    }
}
