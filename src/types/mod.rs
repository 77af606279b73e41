mod event;

pub use event::*;

/// Token traded on the exchange.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub name: String,
    /// Contract address of the token.
    pub address: String,
    pub decimals: u8,
    pub blockchain: String,
}

impl Asset {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        decimals: u8,
        blockchain: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            address: address.into(),
            decimals,
            blockchain: blockchain.into(),
        }
    }
}

/// Swap contract along with the two assets it trades.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SwapRelation {
    /// Address of the pair (swap) contract emitting the events.
    pub contract: String,
    pub asset0: Asset,
    pub asset1: Asset,
}

impl SwapRelation {
    pub fn new(contract: impl Into<String>, asset0: Asset, asset1: Asset) -> Self {
        Self {
            contract: contract.into(),
            asset0,
            asset1,
        }
    }
}

/// Page of the contract events to fetch next.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PollingCursor {
    pub blockchain: String,
    pub contract: String,
    pub page: u64,
}

impl PollingCursor {
    /// Explorer pages are 1-based.
    pub const FIRST_PAGE: u64 = 1;

    pub fn new(blockchain: impl Into<String>, contract: impl Into<String>, page: u64) -> Self {
        Self {
            blockchain: blockchain.into(),
            contract: contract.into(),
            page,
        }
    }

    pub fn first(blockchain: impl Into<String>, contract: impl Into<String>) -> Self {
        Self::new(blockchain, contract, Self::FIRST_PAGE)
    }
}

/// Trading pair as exposed to pair registration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ExchangePair {
    /// Symbol of the base asset.
    pub symbol: String,
    /// Exchange-specific pair name, e.g. `ALPH-USDT`.
    pub foreign_name: String,
    pub exchange: String,
}

impl ExchangePair {
    pub fn new(
        symbol: impl Into<String>,
        foreign_name: impl Into<String>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            foreign_name: foreign_name.into(),
            exchange: exchange.into(),
        }
    }

    /// Key the pair is registered under.
    pub fn identity(&self) -> &str {
        &self.foreign_name
    }
}
