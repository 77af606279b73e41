//! Single polling cycle.

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, warn};

use super::pair::PairRegistry;
use crate::{
    Exchange,
    error::ScraperError,
    rpc::SwapApi,
    store::{CursorStore, SwapCatalog},
    trade::{TradeDecoder, TradeSink},
    types::{PollingCursor, SwapRelation},
};

/// Result of scraping a single relation.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Cursor could not be established, relation skipped.
    NoCursor,
    /// No new events at the cursor page.
    Empty,
    /// Batch processed and cursor advanced.
    Scraped { published: usize },
}

pub(crate) struct Engine<A, S> {
    pub(crate) exchange: Exchange,
    pub(crate) api: A,
    store: S,
    decoder: TradeDecoder,
    sink: TradeSink,
    pairs: Arc<PairRegistry>,
    events_limit: usize,
    sleep_timeout: Duration,
    target_contract: Option<String>,
}

impl<A, S> Engine<A, S>
where
    A: SwapApi,
    S: SwapCatalog + CursorStore,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        exchange: Exchange,
        api: A,
        store: S,
        sink: TradeSink,
        pairs: Arc<PairRegistry>,
        events_limit: usize,
        sleep_timeout: Duration,
        target_contract: Option<String>,
    ) -> Self {
        Self {
            decoder: TradeDecoder::new(exchange.name()),
            exchange,
            api,
            store,
            sink,
            pairs,
            events_limit,
            sleep_timeout,
            target_contract,
        }
    }

    /// Runs one polling pass over all tracked swap relations.
    ///
    /// Per-event and per-relation failures are logged and skipped. Catalog,
    /// event fetch and cursor advance failures abort the pass, as does a trade
    /// that can not be published.
    pub(crate) async fn update(&self) -> Result<(), ScraperError> {
        let relations = self.relations().await.inspect_err(|e| {
            error!(error = %e, blockchain = self.exchange.blockchain(), "failed to list swap relations");
        })?;

        for relation in &relations {
            let outcome = self.scrape_relation(relation).await?;
            if let Outcome::Scraped { published } = outcome {
                debug!(contract = %relation.contract, published, "relation scraped");
                tokio::time::sleep(self.sleep_timeout).await;
            }
        }
        Ok(())
    }

    async fn relations(&self) -> Result<Vec<SwapRelation>, ScraperError> {
        let relations = self
            .store
            .swap_relations(self.exchange.blockchain())
            .await?;
        let Some(target) = self.target_contract.as_deref() else {
            return Ok(relations);
        };
        let target_relation = relations.into_iter().find(|r| r.contract == target);
        if target_relation.is_none() {
            warn!(contract = target, "target swap contract is not tracked, nothing to scrape");
        }
        Ok(target_relation.into_iter().collect())
    }

    async fn cursor(&self, relation: &SwapRelation) -> Option<PollingCursor> {
        let blockchain = self.exchange.blockchain();
        if let Err(e) = self
            .store
            .ensure_cursor(&PollingCursor::first(blockchain, &relation.contract))
            .await
        {
            error!(error = %e, contract = %relation.contract, "failed to create polling cursor");
            return None;
        }
        self.store
            .cursor(&relation.contract, blockchain)
            .await
            .inspect_err(|e| {
                error!(error = %e, contract = %relation.contract, "failed to read polling cursor");
            })
            .ok()
    }

    async fn scrape_relation(&self, relation: &SwapRelation) -> Result<Outcome, ScraperError> {
        let Some(cursor) = self.cursor(relation).await else {
            return Ok(Outcome::NoCursor);
        };

        let events = self
            .api
            .swap_events(&relation.contract, self.events_limit, cursor.page)
            .await
            .inspect_err(|e| {
                error!(error = %e, contract = %relation.contract, page = cursor.page, "failed to fetch swap events");
            })?;

        if events.is_empty() {
            info!(contract = %relation.contract, page = cursor.page, "empty events, skip to next contract");
            return Ok(Outcome::Empty);
        }

        let mut published = 0;
        for event in &events {
            debug!(contract = %relation.contract, page = cursor.page, tx_hash = %event.tx_hash, "swap event");
            let timestamp = match self.api.transaction_timestamp(&event.tx_hash).await {
                Ok(timestamp) => timestamp,
                Err(e) => {
                    error!(error = %e, tx_hash = %event.tx_hash, "failed to fetch transaction details");
                    continue;
                }
            };
            let trade = match self.decoder.decode(relation, event, timestamp) {
                Ok(trade) => trade,
                Err(e) => {
                    warn!(error = %e, tx_hash = %event.tx_hash, "failed to decode swap event");
                    continue;
                }
            };
            info!(
                pair = %trade.pair,
                price = %trade.price,
                volume = %trade.volume,
                tx_hash = %trade.foreign_trade_id,
                "trade"
            );

            let (base, quote, time) = (
                trade.base_token.symbol.clone(),
                trade.quote_token.symbol.clone(),
                trade.time,
            );
            self.sink.publish(trade).await?;
            self.pairs.record(&base, &quote, time);
            published += 1;
        }

        let next_page = cursor.page + 1;
        self.store
            .advance_cursor(&cursor.contract, &cursor.blockchain, next_page)
            .await
            .inspect_err(|e| {
                error!(error = %e, contract = %cursor.contract, page = next_page, "failed to advance polling cursor");
            })?;

        Ok(Outcome::Scraped { published })
    }
}
