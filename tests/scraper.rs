use std::{sync::Arc, time::Duration};

use ayin_scraper::{
    Exchange,
    config::ScraperConfig,
    error::ScraperError,
    scraper::Scraper,
    testing::{self, MockApi, TestStore},
    trade::TradeReceiver,
    types::ExchangePair,
};
use fastnum::{dec256, udec256};
use tokio_test::{assert_err, assert_ok};

const WAIT: Duration = Duration::from_secs(5);

fn config() -> ScraperConfig {
    ScraperConfig {
        refresh_delay: 10,
        sleep_timeout: 0,
        events_limit: 10,
        trade_channel_capacity: 16,
        ..Default::default()
    }
}

fn scraper(
    api: &MockApi,
    store: &TestStore,
    config: ScraperConfig,
    scrape: bool,
) -> (Scraper<MockApi, TestStore>, TradeReceiver) {
    Scraper::new(Exchange::ayin(), config, api.clone(), store.clone(), scrape)
}

fn drain(rx: &mut TradeReceiver) -> Vec<String> {
    std::iter::from_fn(|| rx.try_recv())
        .map(|t| t.foreign_trade_id)
        .collect()
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Trades are delivered in event order and the cursor moves one page per
/// non-empty batch.
#[tokio::test]
async fn test_update_pages_through_events() {
    let api = MockApi::new();
    for i in 0..3 {
        api.push_event("alph-usdt", testing::sell_alph(&format!("tx{i}"), 1, 2), 1_000 + i);
    }
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let config = ScraperConfig {
        events_limit: 2,
        ..config()
    };
    let (scraper, mut rx) = scraper(&api, &store, config, false);

    assert_ok!(scraper.update().await);
    assert_eq!(store.page("alph-usdt"), Some(2));
    assert_eq!(drain(&mut rx), vec!["tx0", "tx1"]);

    assert_ok!(scraper.update().await);
    assert_eq!(store.page("alph-usdt"), Some(3));
    let trade = rx.try_recv().unwrap();
    assert_eq!(trade.foreign_trade_id, "tx2");
    assert_eq!(trade.time, 1_002);
    assert_eq!(trade.pair, "ALPH-USDT");
    assert_eq!(trade.price, udec256!(2));
    assert_eq!(trade.volume, dec256!(-1));
    assert_eq!(trade.source, "Ayin");

    // empty page leaves the cursor alone
    assert_ok!(scraper.update().await);
    assert_eq!(store.page("alph-usdt"), Some(3));
    assert!(rx.is_empty());
    assert_eq!(
        api.event_requests(),
        vec![
            ("alph-usdt".to_string(), 1),
            ("alph-usdt".to_string(), 2),
            ("alph-usdt".to_string(), 3),
        ]
    );
}

#[tokio::test]
async fn test_cursor_created_on_first_visit() {
    let api = MockApi::new();
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, mut rx) = scraper(&api, &store, config(), false);

    assert_eq!(store.page("alph-usdt"), None);
    assert_ok!(scraper.update().await);
    assert_eq!(store.page("alph-usdt"), Some(1));
    assert!(rx.try_recv().is_none());
}

/// An event fetch failure aborts the cycle, later contracts are not visited.
#[tokio::test]
async fn test_fetch_failure_aborts_cycle() {
    let api = MockApi::new();
    api.push_event("pair-a", testing::sell_alph("a0", 1, 2), 1);
    api.push_event("pair-c", testing::sell_alph("c0", 1, 2), 1);
    api.fail_events("pair-b");
    let store = TestStore::with_relations(["pair-a", "pair-b", "pair-c"].map(testing::relation));
    let (scraper, mut rx) = scraper(&api, &store, config(), false);

    let result = scraper.update().await;
    assert!(matches!(result, Err(ScraperError::Rpc(_))));

    assert_eq!(drain(&mut rx), vec!["a0"]);
    assert_eq!(store.page("pair-a"), Some(2));
    assert_eq!(store.page("pair-b"), Some(1));
    assert_eq!(store.page("pair-c"), None);
    let contracts: Vec<_> = api.event_requests().into_iter().map(|(c, _)| c).collect();
    assert_eq!(contracts, vec!["pair-a", "pair-b"]);
}

#[tokio::test]
async fn test_failed_transaction_lookup_skips_event() {
    let api = MockApi::new();
    api.push_event("alph-usdt", testing::sell_alph("tx0", 1, 2), 1);
    api.push_event("alph-usdt", testing::sell_alph("tx1", 1, 2), 2);
    api.fail_tx("tx0");
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, mut rx) = scraper(&api, &store, config(), false);

    assert_ok!(scraper.update().await);
    assert_eq!(drain(&mut rx), vec!["tx1"]);
    assert_eq!(store.page("alph-usdt"), Some(2));
}

#[tokio::test]
async fn test_undecodable_event_is_skipped() {
    let api = MockApi::new();
    api.push_event(
        "alph-usdt",
        ayin_scraper::types::RawSwapEvent::from_values("bad", &["_", "1000", "0", "0", "0"]),
        1,
    );
    api.push_event("alph-usdt", testing::sell_alph("good", 1, 2), 2);
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, mut rx) = scraper(&api, &store, config(), false);

    assert_ok!(scraper.update().await);
    assert_eq!(drain(&mut rx), vec!["good"]);
    assert_eq!(store.page("alph-usdt"), Some(2));
}

#[tokio::test]
async fn test_cursor_failure_skips_relation() {
    let api = MockApi::new();
    api.push_event("pair-a", testing::sell_alph("a0", 1, 2), 1);
    api.push_event("pair-b", testing::sell_alph("b0", 1, 2), 1);
    let store = TestStore::with_relations(["pair-a", "pair-b"].map(testing::relation));
    store.fail_ensure("pair-a");
    let (scraper, mut rx) = scraper(&api, &store, config(), false);

    assert_ok!(scraper.update().await);
    assert_eq!(drain(&mut rx), vec!["b0"]);
    assert_eq!(api.event_requests(), vec![("pair-b".to_string(), 1)]);
}

#[tokio::test]
async fn test_catalog_failure_aborts_cycle() {
    let api = MockApi::new();
    let store = TestStore::with_relations([testing::alph_usdt()]);
    store.fail_catalog(true);
    let (scraper, _rx) = scraper(&api, &store, config(), false);

    let result = scraper.update().await;
    assert!(matches!(result, Err(ScraperError::Store(_))));
    assert!(api.calls().is_empty());
}

/// Published trades are delivered again when the cursor could not be moved.
#[tokio::test]
async fn test_advance_failure_redelivers_batch() {
    let api = MockApi::new();
    api.push_event("alph-usdt", testing::sell_alph("tx0", 1, 2), 1);
    let store = TestStore::with_relations([testing::alph_usdt()]);
    store.fail_advance(true);
    let (scraper, mut rx) = scraper(&api, &store, config(), false);

    let result = scraper.update().await;
    assert_err!(&result);
    assert!(matches!(result, Err(ScraperError::Store(_))));
    assert_eq!(store.page("alph-usdt"), Some(1));

    store.fail_advance(false);
    assert_ok!(scraper.update().await);
    assert_eq!(store.page("alph-usdt"), Some(2));
    assert_eq!(drain(&mut rx), vec!["tx0", "tx0"]);
}

#[tokio::test]
async fn test_target_contract_filter() {
    let api = MockApi::new();
    let store = TestStore::with_relations(["pair-a", "pair-b"].map(testing::relation));

    let config_for = |target: &str| ScraperConfig {
        target_swap_contract: Some(target.to_string()),
        ..config()
    };

    let (targeted, _rx) = scraper(&api, &store, config_for("pair-b"), false);
    assert_ok!(targeted.update().await);
    assert_eq!(api.event_requests(), vec![("pair-b".to_string(), 1)]);

    // untracked target scrapes nothing
    let (untracked, _rx) = scraper(&api, &store, config_for("pair-x"), false);
    assert_ok!(untracked.update().await);
    assert_eq!(api.event_requests().len(), 1);
    assert_eq!(store.page("pair-a"), None);
}

/// With a full channel the cycle waits for the consumer and the cursor stays
/// put until the whole batch is delivered.
#[tokio::test]
async fn test_slow_consumer_holds_cursor() {
    let api = MockApi::new();
    for i in 0..3 {
        api.push_event("alph-usdt", testing::sell_alph(&format!("tx{i}"), 1, 2), i);
    }
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let config = ScraperConfig {
        trade_channel_capacity: 1,
        ..config()
    };
    let (scraper, mut rx) = scraper(&api, &store, config, false);
    let scraper = Arc::new(scraper);

    let update = tokio::spawn({
        let scraper = scraper.clone();
        async move { scraper.update().await }
    });
    wait_until(|| rx.len() == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!update.is_finished());
    assert_eq!(store.page("alph-usdt"), Some(1));

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(rx.recv().await.unwrap().foreign_trade_id);
    }
    assert_ok!(update.await.unwrap());
    assert_eq!(received, vec!["tx0", "tx1", "tx2"]);
    assert_eq!(store.page("alph-usdt"), Some(2));
}

/// A blocked publish holds back every later relation of the cycle, not just
/// the cursor of the relation being published.
#[tokio::test]
async fn test_slow_consumer_stalls_later_relations() {
    let api = MockApi::new();
    for i in 0..2 {
        api.push_event("pair-a", testing::sell_alph(&format!("a{i}"), 1, 2), i);
    }
    api.push_event("pair-b", testing::sell_alph("b0", 1, 2), 10);
    let store = TestStore::with_relations(["pair-a", "pair-b"].map(testing::relation));
    let config = ScraperConfig {
        trade_channel_capacity: 1,
        ..config()
    };
    let (scraper, mut rx) = scraper(&api, &store, config, false);
    let scraper = Arc::new(scraper);

    let update = tokio::spawn({
        let scraper = scraper.clone();
        async move { scraper.update().await }
    });
    wait_until(|| rx.len() == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(!update.is_finished());
    assert_eq!(store.page("pair-a"), Some(1));
    assert_eq!(store.page("pair-b"), None);
    assert!(api.event_requests().iter().all(|(c, _)| c != "pair-b"));

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(rx.recv().await.unwrap().foreign_trade_id);
    }
    assert_ok!(update.await.unwrap());
    assert_eq!(received, vec!["a0", "a1", "b0"]);
    assert_eq!(store.page("pair-a"), Some(2));
    assert_eq!(store.page("pair-b"), Some(2));
}

#[tokio::test]
async fn test_update_after_close_is_rejected() {
    let api = MockApi::new();
    api.push_event("alph-usdt", testing::sell_alph("tx0", 1, 2), 1);
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, mut rx) = scraper(&api, &store, config(), false);

    assert_ok!(scraper.close().await);
    assert!(matches!(scraper.update().await, Err(ScraperError::Closed)));

    assert!(api.calls().is_empty());
    assert_eq!(store.page("alph-usdt"), None);
    assert!(rx.try_recv().is_none());
}

#[tokio::test]
async fn test_panicked_task_reported_on_close() {
    let api = MockApi::new();
    api.panic_on_events("alph-usdt");
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, _rx) = scraper(&api, &store, config(), true);
    let handle = scraper
        .register_pair(ExchangePair::new("ALPH", "ALPH-USDT", "Ayin"))
        .unwrap();

    wait_until(|| !api.event_requests().is_empty()).await;

    let result = scraper.close().await;
    let Err(ScraperError::Terminated(err)) = result else {
        panic!("expected terminated scraper, got {result:?}");
    };
    assert!(matches!(*err, ScraperError::TaskFailed(_)));
    assert!(matches!(
        handle.error().as_deref(),
        Some(ScraperError::TaskFailed(_))
    ));
}

#[tokio::test]
async fn test_last_record_follows_published_trades() {
    let api = MockApi::new();
    api.push_event("alph-usdt", testing::sell_alph("tx0", 1, 2), 1_000);
    api.push_event("alph-usdt", testing::sell_alph("tx1", 1, 2), 3_000);
    api.push_event("alph-usdt", testing::sell_alph("tx2", 1, 2), 2_000);
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, _rx) = scraper(&api, &store, config(), false);

    let handle = scraper
        .register_pair(ExchangePair::new("ALPH", "ALPH-USDT", "Ayin"))
        .unwrap();
    assert_eq!(handle.last_record(), 0);

    assert_ok!(scraper.update().await);
    assert_eq!(handle.last_record(), 3_000);
    assert!(
        scraper
            .pair("ALPH-USDT")
            .unwrap()
            .same_registration(&handle)
    );
}

#[tokio::test]
async fn test_background_loop_delivers_trades() {
    let api = MockApi::new();
    api.push_event("alph-usdt", testing::sell_alph("tx0", 1, 2), 1);
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, mut rx) = scraper(&api, &store, config(), true);

    let trade = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(trade.foreign_trade_id, "tx0");
    wait_until(|| store.page("alph-usdt") == Some(2)).await;

    assert_ok!(scraper.close().await);
    assert!(scraper.is_closed());
    assert!(scraper.error().is_none());

    // channel ends once the scraper is gone
    drop(scraper);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_close_twice() {
    let api = MockApi::new();
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let (scraper, _rx) = scraper(&api, &store, config(), true);
    let handle = scraper
        .register_pair(ExchangePair::new("ALPH", "ALPH-USDT", "Ayin"))
        .unwrap();

    assert_ok!(scraper.close().await);
    assert!(matches!(
        scraper.close().await,
        Err(ScraperError::AlreadyClosed)
    ));
    assert!(matches!(
        scraper.register_pair(ExchangePair::new("ALPH", "ALPH-USDT", "Ayin")),
        Err(ScraperError::Closed)
    ));
    assert!(!handle.is_closed());
    assert!(handle.error().is_none());
}

/// Closing does not wait for a consumer that never reads.
#[tokio::test]
async fn test_close_while_publish_blocked() {
    let api = MockApi::new();
    for i in 0..3 {
        api.push_event("alph-usdt", testing::sell_alph(&format!("tx{i}"), 1, 2), i);
    }
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let config = ScraperConfig {
        trade_channel_capacity: 1,
        ..config()
    };
    let (scraper, rx) = scraper(&api, &store, config, true);

    wait_until(|| rx.len() == 1).await;
    assert_ok!(tokio::time::timeout(WAIT, scraper.close()).await.unwrap());
    assert_eq!(store.page("alph-usdt"), Some(1));
}

#[tokio::test]
async fn test_consecutive_failures_terminate_scraper() {
    let api = MockApi::new();
    api.fail_events("alph-usdt");
    let store = TestStore::with_relations([testing::alph_usdt()]);
    let config = ScraperConfig {
        max_consecutive_failures: Some(2),
        ..config()
    };
    let (scraper, _rx) = scraper(&api, &store, config, true);
    let handle = scraper
        .register_pair(ExchangePair::new("ALPH", "ALPH-USDT", "Ayin"))
        .unwrap();

    wait_until(|| scraper.is_closed()).await;

    assert!(matches!(
        scraper.error().as_deref(),
        Some(ScraperError::TooManyFailures { count: 2, .. })
    ));
    assert!(matches!(
        handle.error().as_deref(),
        Some(ScraperError::TooManyFailures { .. })
    ));
    assert!(matches!(
        scraper.register_pair(ExchangePair::new("USDT", "USDT-ALPH", "Ayin")),
        Err(ScraperError::Terminated(_))
    ));
    assert!(matches!(
        scraper.close().await,
        Err(ScraperError::AlreadyClosed)
    ));
    assert_eq!(api.event_requests().len(), 2);
}
