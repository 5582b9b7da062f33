use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands::*, TraceLevel};
use dotenv::dotenv;
use oichain_warehouse::{report, Config, ExtractError, Poller, Session, SnapshotStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, subscriber, trace, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;

fn preprocess(trace_level: Level) {
    dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .finish();
    subscriber::set_global_default(my_subscriber).expect("Set subscriber");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.trace {
        TraceLevel::DEBUG => Level::DEBUG,
        TraceLevel::INFO => Level::INFO,
        TraceLevel::WARN => Level::WARN,
        TraceLevel::ERROR => Level::ERROR,
    };

    preprocess(log_level);
    trace!("Command line input recorded: {cli:#?}");

    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.store {
        config.store_dir = dir.clone();
    }
    debug!("Configuration: {config:#?}");

    ////////////////////////////////////////////////////////////////////////////////////////////////////

    // cli framework:
    // "> oichain <COMMAND>"
    match &cli.command {
        // "> oichain poll [--symbols NIFTY,HDFCBANK] [--interval 180]"
        // fetch & save snapshots until Ctrl-C
        Poll { symbols, interval } => {
            if let Some(symbols) = symbols {
                config.symbols = symbols.clone();
            }
            if let Some(secs) = interval {
                config.interval = Duration::from_secs(*secs);
            }

            let session = Session::new(&config)?;
            let store = Arc::new(SnapshotStore::new(&config.store_dir));
            let poller = Poller::new(
                session,
                store,
                config.symbols.clone(),
                config.base_url.clone(),
                config.interval,
            );

            let (stop_tx, stop_rx) = watch::channel(false);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Ctrl-C received; stopping after the current round");
                        let _ = stop_tx.send(true);
                    }
                    Err(e) => {
                        // keep the sender alive, or the poller reads its drop as a stop
                        error!("failed to listen for Ctrl-C: {e}");
                        std::future::pending::<()>().await;
                    }
                }
            });

            info!(
                "Polling {} symbol(s) every {}s into {}",
                config.symbols.len(),
                config.interval.as_secs(),
                config.store_dir.display()
            );
            let rounds = poller.run(stop_rx).await?;
            info!("Polling stopped after {rounds} round(s)");
        }

        // "> oichain report --expiry 2024-11-28 [--symbols NIFTY,HDFCBANK]"
        // print the per-strike table of each stored snapshot
        Report { expiry, symbols } => {
            if let Some(symbols) = symbols {
                config.symbols = symbols.clone();
            }
            let expiry = expiry.or(config.expiry).ok_or_else(|| {
                anyhow::anyhow!("no target expiry; pass --expiry or set OICHAIN_EXPIRY")
            })?;

            let store = SnapshotStore::new(&config.store_dir);
            for symbol in &config.symbols {
                match report::stored_rows(&store, symbol, expiry).await {
                    Ok(Some(rows)) => {
                        debug!("[{symbol}] {} row(s) for {expiry}", rows.len());
                        println!("{}", report::render(symbol, expiry, &rows));
                    }
                    Ok(None) => {
                        warn!("[{symbol}] no snapshot in {}; run `poll` first", store.dir().display());
                    }
                    Err(e) => match e.downcast_ref::<ExtractError>() {
                        Some(malformed) => error!("[{symbol}] skipped: {malformed}"),
                        None => error!("[{symbol}] failed to read snapshot: {e}"),
                    },
                }
            }
        }

        // "> oichain rm"
        // remove the snapshot store
        Rm => {
            let store = SnapshotStore::new(&config.store_dir);
            trace!("Removing directory: {}", store.dir().display());
            store.clear().await?;
            debug!("Removed directory: {}", store.dir().display());
        }
    }

    Ok(())
}
