use crate::schema::common_de::parse_expiry;
use anyhow::Context;
use chrono::NaiveDate;
use dotenv::var;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const NSE: &str = "https://www.nseindia.com";

/// Browser user agent the provider accepts; overridden by `USER_AGENT`.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Index underlyings; any other symbol is read as an equity.
const INDICES: [&str; 5] = ["NIFTY", "BANKNIFTY", "FINNIFTY", "MIDCPNIFTY", "NIFTYNXT50"];

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Symbols
//
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Index,
    Equity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub segment: Segment,
}

impl Symbol {
    pub fn index(name: &str) -> Self {
        Self {
            name: name.to_uppercase(),
            segment: Segment::Index,
        }
    }

    pub fn equity(name: &str) -> Self {
        Self {
            name: name.to_uppercase(),
            segment: Segment::Equity,
        }
    }

    /// Option chain endpoint of this symbol, under the provider root `base`.
    pub fn endpoint(&self, base: &str) -> String {
        let path = match self.segment {
            Segment::Index => "option-chain-indices",
            Segment::Equity => "option-chain-equities",
        };
        format!("{}/api/{path}?symbol={}", base.trim_end_matches('/'), self.name)
    }

    /// Name of this symbol's document in the snapshot store, e.g., `nifty.json`.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.name.to_lowercase())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SymbolParseError {
    #[error("empty symbol")]
    Empty,

    #[error("unknown segment `{0}`; expected `index` or `equity`")]
    Segment(String),
}

/// `NIFTY:index`, `HDFCBANK:equity`, or a bare name, whose segment is guessed from the list of
/// known indices.
impl FromStr for Symbol {
    type Err = SymbolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, segment) = match s.trim().split_once(':') {
            Some((name, segment)) => (name.trim(), Some(segment.trim())),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err(SymbolParseError::Empty);
        }

        match segment.map(|seg| seg.to_lowercase()) {
            Some(seg) if seg == "index" => Ok(Self::index(name)),
            Some(seg) if seg == "equity" => Ok(Self::equity(name)),
            Some(seg) => Err(SymbolParseError::Segment(seg)),
            None if INDICES.contains(&name.to_uppercase().as_str()) => Ok(Self::index(name)),
            None => Ok(Self::equity(name)),
        }
    }
}

pub fn parse_symbols(s: &str) -> Result<Vec<Symbol>, SymbolParseError> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(Symbol::from_str)
        .collect()
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Config
//
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct Config {
    /// Provider root; also the bootstrap endpoint and the `Referer`.
    pub base_url: String,
    pub user_agent: String,
    pub store_dir: PathBuf,
    /// Pause between the end of one round and the start of the next.
    pub interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause after bootstrapping, before the first data request.
    pub warmup: Duration,
    pub symbols: Vec<Symbol>,
    pub expiry: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: NSE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            store_dir: PathBuf::from("./snapshots"),
            interval: Duration::from_secs(180),
            timeout: Duration::from_secs(30),
            warmup: Duration::from_secs(1),
            symbols: vec![Symbol::index("NIFTY"), Symbol::equity("HDFCBANK")],
            expiry: None,
        }
    }
}

impl Config {
    /// Build from the environment (and `.env`, once `dotenv()` has run), falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = var("OICHAIN_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(agent) = var("USER_AGENT") {
            config.user_agent = agent;
        }
        if let Ok(dir) = var("OICHAIN_STORE_DIR") {
            config.store_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = var("OICHAIN_INTERVAL_SECS") {
            config.interval = Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("OICHAIN_INTERVAL_SECS is not a number: {secs}"))?,
            );
        }
        if let Ok(secs) = var("OICHAIN_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("OICHAIN_TIMEOUT_SECS is not a number: {secs}"))?,
            );
        }
        if let Ok(millis) = var("OICHAIN_WARMUP_MILLIS") {
            config.warmup = Duration::from_millis(
                millis
                    .parse()
                    .with_context(|| format!("OICHAIN_WARMUP_MILLIS is not a number: {millis}"))?,
            );
        }
        if let Ok(symbols) = var("OICHAIN_SYMBOLS") {
            config.symbols = parse_symbols(&symbols).context("OICHAIN_SYMBOLS")?;
        }
        if let Ok(expiry) = var("OICHAIN_EXPIRY") {
            config.expiry = Some(
                parse_expiry(&expiry)
                    .ok_or_else(|| anyhow::anyhow!("OICHAIN_EXPIRY is not a date: {expiry}"))?,
            );
        }

        Ok(config)
    }
}
