//! In-memory storage backend.
//!
//! Useful for tests and for short-lived scrapers that discover their swap
//! relations on startup. All data is lost when the process exits.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{CursorStore, SwapCatalog};
use crate::{
    error::StoreError,
    types::{PollingCursor, SwapRelation},
};

/// In-memory catalog and cursor store.
///
/// Clones share the same underlying data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    relations: Arc<RwLock<Vec<(String, SwapRelation)>>>,
    cursors: Arc<DashMap<(String, String), u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the relation to the catalog, replacing a relation with the same contract.
    pub fn insert_swap_relation(&self, blockchain: &str, relation: SwapRelation) {
        let mut relations = self.relations.write();
        match relations
            .iter_mut()
            .find(|(chain, r)| chain == blockchain && r.contract == relation.contract)
        {
            Some(existing) => existing.1 = relation,
            None => relations.push((blockchain.to_string(), relation)),
        }
    }

    /// Current page of the contract, if a cursor exists.
    pub fn page(&self, contract: &str, blockchain: &str) -> Option<u64> {
        self.cursors.get(&key(contract, blockchain)).map(|p| *p)
    }

    pub fn cursor_count(&self) -> usize {
        self.cursors.len()
    }
}

fn key(contract: &str, blockchain: &str) -> (String, String) {
    (blockchain.to_string(), contract.to_string())
}

impl SwapCatalog for MemoryStore {
    async fn swap_relations(&self, blockchain: &str) -> Result<Vec<SwapRelation>, StoreError> {
        Ok(self
            .relations
            .read()
            .iter()
            .filter(|(chain, _)| chain == blockchain)
            .map(|(_, r)| r.clone())
            .collect())
    }
}

impl CursorStore for MemoryStore {
    async fn ensure_cursor(&self, cursor: &PollingCursor) -> Result<(), StoreError> {
        self.cursors
            .entry(key(&cursor.contract, &cursor.blockchain))
            .or_insert(cursor.page);
        Ok(())
    }

    async fn cursor(&self, contract: &str, blockchain: &str) -> Result<PollingCursor, StoreError> {
        self.page(contract, blockchain)
            .map(|page| PollingCursor::new(blockchain, contract, page))
            .ok_or_else(|| StoreError::CursorNotFound {
                contract: contract.to_string(),
                blockchain: blockchain.to_string(),
            })
    }

    async fn advance_cursor(
        &self,
        contract: &str,
        blockchain: &str,
        page: u64,
    ) -> Result<(), StoreError> {
        match self.cursors.get_mut(&key(contract, blockchain)) {
            Some(mut current) => {
                *current = (*current).max(page);
                Ok(())
            }
            None => Err(StoreError::CursorNotFound {
                contract: contract.to_string(),
                blockchain: blockchain.to_string(),
            }),
        }
    }
}
