//! Account balance tracker daemon
//!
//! Watches the latest blocks on one network and keeps balances fresh for
//! a watchlist of accounts, printing the tracked state after each poll.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tally::{
    AccountTracker, PollingBlockSource, RpcClient, StaticContext, StaticRegistry,
};
use tracing::{info, Level};

/// Account balance tracker
#[derive(Parser)]
#[command(name = "tallyd")]
#[command(about = "Track account balances across blocks on an Ethereum network")]
struct Args {
    /// RPC endpoint URL (e.g., https://eth.llamarpc.com)
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Path to watchlist file (one address per line)
    #[arg(short, long, default_value = "watchlist.txt")]
    watchlist: PathBuf,

    /// Chain id of the network behind the RPC endpoint
    #[arg(short, long, default_value_t = 1)]
    chain_id: u64,

    /// Seconds between latest-block polls
    #[arg(short, long, default_value_t = 12)]
    interval: u64,

    /// Fetch balances for every watched account, not just the first
    #[arg(short, long)]
    multi_account: bool,

    /// Seconds between state printouts
    #[arg(short, long, default_value_t = 60)]
    print_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    info!("Starting account balance tracker");
    info!("RPC URL: {}", args.rpc_url);
    info!("Chain id: {}", args.chain_id);
    info!("Watchlist: {:?}", args.watchlist);

    let accounts = tally::watchlist::load_watchlist(&args.watchlist)
        .context("Failed to load watchlist")?;
    info!("Tracking {} accounts", accounts.len());

    let provider = Arc::new(RpcClient::new(args.rpc_url.clone()));
    let block_source = Arc::new(PollingBlockSource::new(
        provider.clone(),
        Duration::from_secs(args.interval),
    ));
    let context = Arc::new(StaticContext::new(
        accounts[0],
        args.chain_id,
        args.rpc_url,
        args.multi_account,
    ));
    let registry = Arc::new(StaticRegistry::new());

    let tracker = Arc::new(AccountTracker::new(
        provider,
        block_source.clone(),
        registry,
        context,
        &accounts,
    ));

    tracker.start();

    let printer = tracker.clone();
    let print_interval = Duration::from_secs(args.print_interval);
    let print_loop = async move {
        let mut ticker = tokio::time::interval(print_interval);
        ticker.tick().await; // skip the immediate first tick
        loop {
            ticker.tick().await;
            match serde_json::to_string_pretty(&printer.snapshot()) {
                Ok(json) => info!("Tracked state:\n{}", json),
                Err(err) => info!("Failed to render state: {}", err),
            }
        }
    };

    // Handle Ctrl+C gracefully
    tokio::select! {
        _ = block_source.run() => {}
        _ = print_loop => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    tracker.stop();
    info!("Tracker stopped");
    Ok(())
}
