//! Persistence collaborators: the catalog of tracked swap relations and the
//! per-contract polling cursors.

mod memory;

use std::future::Future;

pub use memory::MemoryStore;

use crate::{
    error::StoreError,
    types::{PollingCursor, SwapRelation},
};

/// Catalog of swap relations to scrape.
pub trait SwapCatalog: Send + Sync {
    /// Swap relations tracked on the blockchain, in a stable order.
    fn swap_relations(
        &self,
        blockchain: &str,
    ) -> impl Future<Output = Result<Vec<SwapRelation>, StoreError>> + Send;
}

/// Storage of per-contract polling cursors.
///
/// Pages of a contract never go backwards: the scraper only ever advances
/// them by one.
pub trait CursorStore: Send + Sync {
    /// Inserts the cursor unless one already exists for its contract.
    fn ensure_cursor(
        &self,
        cursor: &PollingCursor,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn cursor(
        &self,
        contract: &str,
        blockchain: &str,
    ) -> impl Future<Output = Result<PollingCursor, StoreError>> + Send;

    /// Moves the page of an existing cursor forward. A page behind the
    /// stored one leaves the cursor unchanged.
    fn advance_cursor(
        &self,
        contract: &str,
        blockchain: &str,
        page: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
