//! Trade data structures and delivery channel.

use fastnum::{D256, UD256};
use tokio::sync::{mpsc, watch};

use crate::{error::ScraperError, types::Asset};

/// A normalized swap.
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct Trade {
    /// Transaction timestamp, unix milliseconds.
    pub time: i64,

    /// Pair symbol, `BASE-QUOTE`.
    pub symbol: String,

    /// Same as `symbol`.
    pub pair: String,

    /// Quote amount paid per unit of base (normalized decimal).
    #[debug("{price}")]
    pub price: UD256,

    /// Signed base amount, negative when the base asset was swapped in.
    #[debug("{volume}")]
    pub volume: D256,

    /// Hash of the transaction the swap occurred in.
    pub foreign_trade_id: String,

    /// Exchange name.
    pub source: String,

    pub base_token: Asset,

    pub quote_token: Asset,

    pub verified_pair: bool,
}

/// Creates the bounded trade channel, capacity is at least one.
pub fn trade_channel(
    capacity: usize,
    shutdown: watch::Receiver<bool>,
) -> (TradeSink, TradeReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TradeSink { inner: tx, shutdown },
        TradeReceiver { inner: rx },
    )
}

/// Producer side of the trade channel.
///
/// [`TradeSink::publish`] waits for free capacity, giving up only when
/// shutdown is requested or the receiver is gone.
#[derive(Clone, Debug)]
pub struct TradeSink {
    inner: mpsc::Sender<Trade>,
    shutdown: watch::Receiver<bool>,
}

impl TradeSink {
    pub async fn publish(&self, trade: Trade) -> Result<(), ScraperError> {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            biased;
            sent = self.inner.send(trade) => sent.map_err(|_| ScraperError::ReceiverDropped),
            _ = shutdown_requested(&mut shutdown) => Err(ScraperError::ShuttingDown),
        }
    }
}

/// Resolves once shutdown is signalled or the signalling side is dropped.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Receiver for trades.
#[derive(Debug)]
pub struct TradeReceiver {
    inner: mpsc::Receiver<Trade>,
}

impl TradeReceiver {
    /// Receives the next trade, or `None` if the scraper is gone.
    pub async fn recv(&mut self) -> Option<Trade> {
        self.inner.recv().await
    }

    /// Receives a trade if one is already queued.
    pub fn try_recv(&mut self) -> Option<Trade> {
        self.inner.try_recv().ok()
    }

    /// Number of trades waiting to be received.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_publish_blocks_until_capacity() {
        let (_stop, shutdown) = watch::channel(false);
        let (sink, mut rx) = trade_channel(1, shutdown);

        assert_ok!(sink.publish(testing::trade("tx1")).await);
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            sink.publish(testing::trade("tx2")),
        )
        .await;
        assert!(blocked.is_err(), "second publish must wait for the consumer");

        assert_eq!(rx.recv().await.unwrap().foreign_trade_id, "tx1");
        assert_ok!(sink.publish(testing::trade("tx3")).await);
        assert_eq!(rx.recv().await.unwrap().foreign_trade_id, "tx3");
    }

    #[tokio::test]
    async fn test_publish_gives_up_on_shutdown() {
        let (stop, shutdown) = watch::channel(false);
        let (sink, _rx) = trade_channel(1, shutdown);
        assert_ok!(sink.publish(testing::trade("tx1")).await);

        let pending = tokio::spawn({
            let sink = sink.clone();
            async move { sink.publish(testing::trade("tx2")).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.send_replace(true);

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ScraperError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_publish_fails_without_receiver() {
        let (_stop, shutdown) = watch::channel(false);
        let (sink, rx) = trade_channel(4, shutdown);
        drop(rx);

        let result = sink.publish(testing::trade("tx1")).await;
        assert_err!(&result);
        assert!(matches!(result, Err(ScraperError::ReceiverDropped)));
    }
}
