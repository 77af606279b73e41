//! Ayin DEX swap scraper.
//!
//! # Overview
//!
//! Polls swap events emitted by the Ayin DEX pair contracts on Alephium,
//! normalizes every event into a [`trade::Trade`] and streams the trades
//! through a bounded channel.
//!
//! Use [`scraper::Scraper::new`] to construct the scraper with a [`rpc::SwapApi`]
//! implementation (see [`rpc::AlephiumClient`]) and a store implementing
//! [`store::SwapCatalog`] and [`store::CursorStore`] (see [`store::MemoryStore`]),
//! then consume trades from the returned [`trade::TradeReceiver`].
//!
//! Per-contract progress is kept as page cursors in the store, so a restarted
//! scraper resumes where the previous one stopped. Delivery is at-least-once:
//! a cursor is advanced only after its whole event batch has been published.
//!
//! # Limitations/follow-ups
//!
//! * Explorer pagination is offset based; a partially filled page is never
//!   re-read once its cursor moves on.
//!
//! * Only the in-memory store is provided.
//!
//! # Testing
//!
//! [`testing`] module provides scripted API and store doubles plus fixtures
//! for the common ALPH/USDT pair.

pub mod config;
pub mod error;
pub mod num;
pub mod rpc;
pub mod scraper;
pub mod store;
pub mod testing;
pub mod trade;
pub mod types;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Exchange the scraper is collecting trades for.
pub struct Exchange {
    name: String,
    blockchain: String,
}

impl Exchange {
    pub fn ayin() -> Self {
        Self {
            name: "Ayin".to_string(),
            blockchain: "Alephium".to_string(),
        }
    }

    pub fn custom(name: impl Into<String>, blockchain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blockchain: blockchain.into(),
        }
    }

    /// Exchange name, used as trade source and configuration namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blockchain(&self) -> &str {
        &self.blockchain
    }
}
