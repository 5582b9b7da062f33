use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use oichain_warehouse::{schema::common_de::parse_expiry, Symbol};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing
    #[arg(long, default_value = "INFO")]
    pub trace: TraceLevel,

    /// Directory holding one snapshot per symbol [env: OICHAIN_STORE_DIR]
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch option chain snapshots in rounds, until Ctrl-C.
    Poll {
        /// Symbols to fetch, in order, e.g., `NIFTY:index,HDFCBANK:equity` [env: OICHAIN_SYMBOLS]
        #[arg(long, value_delimiter = ',')]
        symbols: Option<Vec<Symbol>>,

        /// Seconds between rounds [env: OICHAIN_INTERVAL_SECS]
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Print the per-strike table of one expiry, from the stored snapshots.
    Report {
        /// Target expiry, e.g., `2024-11-28` or `28-Nov-2024` [env: OICHAIN_EXPIRY]
        #[arg(long, value_parser = expiry)]
        expiry: Option<NaiveDate>,

        /// Symbols to report on [env: OICHAIN_SYMBOLS]
        #[arg(long, value_delimiter = ',')]
        symbols: Option<Vec<Symbol>>,
    },

    /// Remove the snapshot store.
    Rm,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceLevel {
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

fn expiry(s: &str) -> Result<NaiveDate, String> {
    parse_expiry(s).ok_or_else(|| format!("not a date: {s}"))
}
