use crate::api::{Fetch, FetchError};
use crate::config::Symbol;
use crate::schema::option_chain::RawSnapshot;
use crate::store::SnapshotStore;
use oichain_util::RawResponse;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::{self as stream, StreamExt};
use tracing::{debug, error, info, trace, warn};

///////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Fetch-and-persist loop
//
///////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
pub enum FetchOutcome {
    Saved { version: u64 },
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// What happened to each symbol in one round, in polling order.
#[derive(Debug, Default)]
pub struct RoundReport {
    pub outcomes: Vec<(Symbol, FetchOutcome)>,
}

impl RoundReport {
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_saved()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.saved()
    }
}

/// Polls every symbol, one after another, then sleeps; repeats until told to stop.
///
/// A failure for one symbol is logged and the loop moves on: the symbol's stored snapshot is
/// left exactly as it was, stale rather than corrupt.
pub struct Poller<F: Fetch> {
    fetcher: F,
    store: Arc<SnapshotStore>,
    symbols: Vec<Symbol>,
    base_url: String,
    interval: Duration,
}

impl<F: Fetch> Poller<F> {
    pub fn new(
        fetcher: F,
        store: Arc<SnapshotStore>,
        symbols: Vec<Symbol>,
        base_url: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            symbols,
            base_url: base_url.into(),
            interval,
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Bootstrap the session, then run rounds until `stop` reads `true` (or its sender is
    /// dropped). Returns the number of completed rounds.
    ///
    /// The stop signal is checked between rounds and during the sleep; a round in progress
    /// always runs to the end.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) -> anyhow::Result<u64> {
        let mut rounds = 0;
        if *stop.borrow_and_update() {
            return Ok(rounds);
        }

        if let Err(e) = self.fetcher.bootstrap().await {
            warn!("Session bootstrap failed, polling with a cold session: {e}");
        }

        loop {
            let report = self.run_round().await;
            rounds += 1;
            info!(
                "Round {rounds} complete: {} saved, {} failed",
                report.saved(),
                report.failed()
            );

            info!("Waiting {}s before the next fetch ...", self.interval.as_secs());
            if stopped_during(&mut stop, self.interval).await {
                debug!("Stop signal received after {rounds} round(s)");
                return Ok(rounds);
            }
        }
    }

    /// Fetch every symbol once, in order.
    pub async fn run_round(&self) -> RoundReport {
        let mut report = RoundReport::default();

        let mut symbols = stream::iter(self.symbols.iter());
        while let Some(symbol) = symbols.next().await {
            let outcome = match self.poll(symbol).await {
                Ok(version) => {
                    info!("[{symbol}] data saved to {}", self.store.path_for(symbol).display());
                    FetchOutcome::Saved { version }
                }
                Err(e) => {
                    match &e {
                        FetchError::MalformedPayload { body, .. } => {
                            error!("[{symbol}] {e}\nResponse Text:\n{body}")
                        }
                        _ => error!("[{symbol}] {e}"),
                    }
                    FetchOutcome::Failed(e)
                }
            };
            report.outcomes.push((symbol.clone(), outcome));
        }

        report
    }

    async fn poll(&self, symbol: &Symbol) -> Result<u64, FetchError> {
        let url = symbol.endpoint(&self.base_url);
        info!("[{symbol}] Fetching data ...");
        let response = self.fetcher.fetch(&url).await?;
        let body = classify(response)?;
        self.store
            .publish(symbol, &body)
            .await
            .map_err(FetchError::Store)
    }
}

/// Accept a response only if it is a 200 whose body reads as an option chain; the body is
/// handed back untouched.
pub fn classify(response: RawResponse) -> Result<Vec<u8>, FetchError> {
    if response.status != StatusCode::OK {
        return Err(FetchError::Status(response.status));
    }
    match RawSnapshot::from_slice(&response.body) {
        Ok(snapshot) => {
            trace!("payload holds {} strike records", snapshot.records.data.len());
            Ok(response.body)
        }
        Err(source) => Err(FetchError::MalformedPayload {
            body: response.text(),
            source,
        }),
    }
}

/// Sleep for `interval`, unless a stop arrives first; `true` means stop.
async fn stopped_during(stop: &mut watch::Receiver<bool>, interval: Duration) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return *stop.borrow_and_update(),
            changed = stop.changed() => match changed {
                Ok(()) if *stop.borrow_and_update() => return true,
                Ok(()) => continue,
                Err(_) => return true,
            },
        }
    }
}
