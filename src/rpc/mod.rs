//! Blockchain data access.
//!
//! [`SwapApi`] is everything the scraper needs from the chain, and
//! [`AlephiumClient`] implements it over the Alephium explorer backend and
//! full node REST APIs.

mod address;
mod client;

use std::future::Future;

pub use address::{ALPH_TOKEN_ID, contract_address, contract_group, contract_id};
pub use client::AlephiumClient;

use crate::{
    error::RpcError,
    types::{Asset, RawSwapEvent},
};

/// Access to swap events and token metadata.
pub trait SwapApi: Send + Sync {
    /// Page of `Swap` events emitted by the contract, oldest first.
    fn swap_events(
        &self,
        contract: &str,
        limit: usize,
        page: u64,
    ) -> impl Future<Output = Result<Vec<RawSwapEvent>, RpcError>> + Send;

    /// Timestamp of the transaction, unix milliseconds.
    fn transaction_timestamp(
        &self,
        tx_hash: &str,
    ) -> impl Future<Output = Result<i64, RpcError>> + Send;

    /// Addresses of the swap (pair) contracts created by the DEX factory.
    fn swap_contract_addresses(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, RpcError>> + Send;

    /// Token addresses traded by the swap contract, in `token0`, `token1` order.
    fn token_pair_addresses(
        &self,
        contract: &str,
    ) -> impl Future<Output = Result<[String; 2], RpcError>> + Send;

    fn token_info(
        &self,
        address: &str,
        blockchain: &str,
    ) -> impl Future<Output = Result<Asset, RpcError>> + Send;
}
