//! Ayin scraper binary - discovers the exchange's swap contracts and prints
//! trades as they are scraped.

use std::process::exit;

use ayin_scraper::{
    Exchange,
    config::ScraperConfig,
    rpc::AlephiumClient,
    scraper::{Scraper, discover_swap_relations},
    store::MemoryStore,
};
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "ayin_scraper")]
#[command(about = "Scrape swap trades of an Alephium DEX and print them")]
struct Args {
    /// Exchange name, also the prefix of configuration variables
    #[arg(short, long, default_value = "Ayin")]
    exchange: String,

    /// Blockchain the exchange runs on
    #[arg(short, long, default_value = "Alephium")]
    blockchain: String,

    /// Stop after this many trades
    #[arg(long)]
    max_trades: Option<usize>,

    /// Skip swap contract discovery, useful with a pre-populated store only
    #[arg(long)]
    no_discover: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let args = Args::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let exchange = Exchange::custom(&args.exchange, &args.blockchain);
    let config = match ScraperConfig::from_env(exchange.name()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let client = match AlephiumClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create API client: {}", e);
            exit(1);
        }
    };

    let store = MemoryStore::new();
    if !args.no_discover {
        match discover_swap_relations(
            &client,
            &exchange,
            config.swap_contracts_limit,
            config.sleep_timeout(),
        )
        .await
        {
            Ok(relations) => {
                info!(count = relations.len(), "swap contracts discovered");
                for relation in relations {
                    store.insert_swap_relation(exchange.blockchain(), relation);
                }
            }
            Err(e) => {
                error!(error = %e, "swap contract discovery failed");
                exit(1);
            }
        }
    }

    let (scraper, mut trades) = Scraper::new(exchange, config, client, store, true);

    let mut count = 0usize;
    loop {
        tokio::select! {
            trade = trades.recv() => {
                let Some(trade) = trade else {
                    warn!("trade channel closed");
                    break;
                };
                println!(
                    "{} {:<16} price: {:<24} volume: {:<24} tx: {}",
                    trade.time, trade.pair, trade.price, trade.volume, trade.foreign_trade_id
                );
                count += 1;
                if args.max_trades.is_some_and(|max| count >= max) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    if let Err(e) = scraper.close().await {
        error!(error = %e, "scraper stopped with error");
        exit(1);
    }
    info!(trades = count, "done");
}
