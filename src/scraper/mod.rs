//! Scraper lifecycle.
//!
//! [`Scraper`] owns a single background task that runs a polling cycle on
//! every tick of the refresh timer until [`Scraper::close`] is called.
//!
//! ```text
//!   Running ──close()──▶ ShuttingDown ──cleanup──▶ Closed
//!      │                                             ▲
//!      └──── max_consecutive_failures reached ───────┘
//! ```
//!
//! The terminal state, with the error the scraper stopped on if any, is
//! shared with every [`PairHandle`] returned by [`Scraper::register_pair`].

mod discovery;
mod engine;
mod pair;
mod state;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{error, info, warn};

pub use discovery::discover_swap_relations;
pub use pair::PairHandle;

use self::{engine::Engine, pair::PairRegistry, state::SharedState};
use crate::{
    Exchange,
    config::ScraperConfig,
    error::ScraperError,
    rpc::SwapApi,
    store::{CursorStore, SwapCatalog},
    trade::{self, TradeReceiver},
    types::{Asset, ExchangePair},
};

/// Swap scraper of a single exchange.
pub struct Scraper<A, S> {
    engine: Arc<Engine<A, S>>,
    pairs: Arc<PairRegistry>,
    state: SharedState,
    shutdown: watch::Sender<bool>,
    close_requested: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    swap_contracts_limit: usize,
    sleep_timeout: Duration,
}

impl<A, S> Scraper<A, S>
where
    A: SwapApi + 'static,
    S: SwapCatalog + CursorStore + 'static,
{
    /// Creates the scraper and the receiver of its trades.
    ///
    /// With `scrape` set the polling task is spawned right away, so this must
    /// be called within a Tokio runtime. Otherwise the scraper stays idle and
    /// cycles run only through [`Scraper::update`].
    pub fn new(
        exchange: Exchange,
        config: ScraperConfig,
        api: A,
        store: S,
        scrape: bool,
    ) -> (Self, TradeReceiver) {
        let state = SharedState::default();
        let pairs = Arc::new(PairRegistry::new(state.clone()));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (sink, receiver) =
            trade::trade_channel(config.trade_channel_capacity, shutdown_rx.clone());

        info!(
            exchange = exchange.name(),
            blockchain = exchange.blockchain(),
            refresh_delay = ?config.refresh_delay(),
            sleep_timeout = ?config.sleep_timeout(),
            events_limit = config.events_limit,
            target_swap_contract = config.target_swap_contract(),
            scrape,
            "Initializing scraper"
        );

        let engine = Arc::new(Engine::new(
            exchange,
            api,
            store,
            sink,
            pairs.clone(),
            config.events_limit,
            config.sleep_timeout(),
            config.target_swap_contract().map(str::to_string),
        ));

        let task = scrape.then(|| {
            tokio::spawn(run(
                engine.clone(),
                state.clone(),
                shutdown_rx,
                config.refresh_delay(),
                config.max_consecutive_failures,
            ))
        });

        let scraper = Self {
            engine,
            pairs,
            state,
            shutdown,
            close_requested: AtomicBool::new(false),
            task: Mutex::new(task),
            swap_contracts_limit: config.swap_contracts_limit,
            sleep_timeout: config.sleep_timeout(),
        };
        (scraper, receiver)
    }

    /// Runs a single polling cycle.
    ///
    /// Fails like [`Scraper::register_pair`] once the scraper is closed.
    pub async fn update(&self) -> Result<(), ScraperError> {
        self.state.read().ensure_running()?;
        self.engine.update().await
    }

    /// Registers the trading pair.
    ///
    /// Fails with the error the scraper terminated with, or with
    /// [`ScraperError::Closed`] if it was closed without one.
    pub fn register_pair(&self, pair: ExchangePair) -> Result<PairHandle, ScraperError> {
        self.pairs.register(pair)
    }

    /// Current handle of the pair registered under the identity.
    pub fn pair(&self, identity: &str) -> Option<PairHandle> {
        self.pairs.get(identity)
    }

    /// Stops the polling task and waits for it to finish.
    ///
    /// Returns the error the scraper terminated with, if any.
    /// [`ScraperError::AlreadyClosed`] is returned if the scraper is closed
    /// already or another close is in progress.
    pub async fn close(&self) -> Result<(), ScraperError> {
        if self.state.is_closed() || self.close_requested.swap(true, Ordering::AcqRel) {
            return Err(ScraperError::AlreadyClosed);
        }
        self.shutdown.send_replace(true);

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!(error = %e, "scraper task failed");
            self.state.close(Some(ScraperError::TaskFailed(e.to_string())));
        }
        // idle scraper, or the task did not get to cleanup
        self.state.close(None);

        match self.state.error() {
            Some(err) => Err(ScraperError::Terminated(err)),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Error the scraper terminated with, if any.
    pub fn error(&self) -> Option<Arc<ScraperError>> {
        self.state.error()
    }

    pub fn exchange(&self) -> &Exchange {
        &self.engine.exchange
    }

    /// Lists all pairs tradable on the exchange.
    pub async fn fetch_available_pairs(&self) -> Result<Vec<ExchangePair>, ScraperError> {
        let exchange = &self.engine.exchange;
        let relations = discover_swap_relations(
            &self.engine.api,
            exchange,
            self.swap_contracts_limit,
            self.sleep_timeout,
        )
        .await?;
        Ok(relations
            .into_iter()
            .map(|r| {
                ExchangePair::new(
                    r.asset0.symbol.clone(),
                    format!("{}-{}", r.asset0.symbol, r.asset1.symbol),
                    exchange.name(),
                )
            })
            .collect())
    }

    /// Symbols need no lookup, assets are resolved from the swap contracts.
    pub fn fill_symbol_data(&self, symbol: &str) -> Asset {
        Asset {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    pub fn normalize_pair(&self, pair: ExchangePair) -> ExchangePair {
        pair
    }
}

/// Polling loop, runs until shutdown is requested or the scraper gives up.
async fn run<A, S>(
    engine: Arc<Engine<A, S>>,
    state: SharedState,
    mut shutdown: watch::Receiver<bool>,
    refresh_delay: Duration,
    max_failures: Option<u32>,
) where
    A: SwapApi,
    S: SwapCatalog + CursorStore,
{
    let mut ticker = tokio::time::interval_at(Instant::now(), refresh_delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;

    let fatal = loop {
        tokio::select! {
            biased;
            _ = trade::shutdown_requested(&mut shutdown) => {
                info!(exchange = engine.exchange.name(), "shutting down");
                break None;
            }
            _ = ticker.tick() => {
                match engine.update().await {
                    Ok(()) => failures = 0,
                    Err(ScraperError::ShuttingDown) => {}
                    Err(e) => {
                        failures += 1;
                        error!(error = %e, failures, "update failed");
                        if max_failures.is_some_and(|max| failures >= max) {
                            warn!(failures, "too many consecutive failures, stopping");
                            break Some(ScraperError::TooManyFailures {
                                count: failures,
                                last: Box::new(e),
                            });
                        }
                    }
                }
            }
        }
    };

    drop(ticker);
    state.close(fatal);
}
