//! Pair registration.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicI64, Ordering},
};

use dashmap::DashMap;

use super::state::SharedState;
use crate::{error::ScraperError, types::ExchangePair};

/// Handle of a registered trading pair.
///
/// The handle has no failure state of its own, [`PairHandle::error`] reports
/// the error the whole scraper stopped on.
#[derive(Clone, Debug)]
pub struct PairHandle {
    inner: Arc<PairInner>,
    state: SharedState,
}

#[derive(Debug)]
struct PairInner {
    pair: ExchangePair,
    closed: AtomicBool,
    last_record: AtomicI64,
}

impl PairHandle {
    fn new(pair: ExchangePair, state: SharedState) -> Self {
        Self {
            inner: Arc::new(PairInner {
                pair,
                closed: AtomicBool::new(false),
                last_record: AtomicI64::new(0),
            }),
            state,
        }
    }

    pub fn pair(&self) -> &ExchangePair {
        &self.inner.pair
    }

    /// Marks the handle closed. The scraper keeps running.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Time of the latest trade published for the pair, unix milliseconds,
    /// zero if none yet.
    pub fn last_record(&self) -> i64 {
        self.inner.last_record.load(Ordering::Acquire)
    }

    /// Error the scraper terminated with, if any.
    pub fn error(&self) -> Option<Arc<ScraperError>> {
        self.state.error()
    }

    /// Whether both handles refer to the same registration.
    pub fn same_registration(&self, other: &PairHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Registered pairs keyed by [`ExchangePair::identity`].
#[derive(Debug)]
pub(crate) struct PairRegistry {
    pairs: DashMap<String, PairHandle>,
    state: SharedState,
}

impl PairRegistry {
    pub(crate) fn new(state: SharedState) -> Self {
        Self {
            pairs: DashMap::new(),
            state,
        }
    }

    /// Registers the pair, replacing an earlier registration of the same identity.
    pub(crate) fn register(&self, pair: ExchangePair) -> Result<PairHandle, ScraperError> {
        // closing waits for registrations in flight
        let lifecycle = self.state.read();
        lifecycle.ensure_running()?;

        let handle = PairHandle::new(pair, self.state.clone());
        self.pairs
            .insert(handle.pair().identity().to_string(), handle.clone());
        Ok(handle)
    }

    pub(crate) fn get(&self, identity: &str) -> Option<PairHandle> {
        self.pairs.get(identity).map(|h| h.clone())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Moves the last record marker of the pool forward.
    ///
    /// Both swap directions of a pool count, so `BASE-QUOTE` and
    /// `QUOTE-BASE` registrations see the same trades.
    pub(crate) fn record(&self, base: &str, quote: &str, time: i64) {
        for identity in [format!("{base}-{quote}"), format!("{quote}-{base}")] {
            if let Some(handle) = self.pairs.get(&identity) {
                handle.inner.last_record.fetch_max(time, Ordering::AcqRel);
            }
        }
    }
}
