//! Trade decoding and delivery.
//!
//! Turns raw `Swap` events of a pair contract into normalized [`Trade`]s and
//! delivers them to a single consumer.
//!
//! # Architecture
//!
//! - [`TradeDecoder`] - Pure, synchronous decoding of a single swap event
//! - [`TradeSink`] - Producer side of the bounded trade channel
//! - [`TradeReceiver`] - Consumer side handed out by the scraper
//!
//! # Backpressure
//!
//! The channel is bounded and the producer blocks when it is full, so a slow
//! consumer stalls the polling cycle and, with it, cursor advancement.
//!
//! # Example
//!
//! ```ignore
//! let (scraper, mut rx) = Scraper::new(Exchange::ayin(), config, api, store, true);
//!
//! while let Some(trade) = rx.recv().await {
//!     println!("{} {} @ {} ({})", trade.pair, trade.volume, trade.price, trade.foreign_trade_id);
//! }
//! ```

mod decoder;
mod types;

pub use decoder::TradeDecoder;
pub use types::{Trade, TradeReceiver, TradeSink, trade_channel};
pub(crate) use types::shutdown_requested;
