use super::common_de::{de_f64, de_opt_f64, de_side, parse_expiry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

///////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Input: NSE option chain
//
///////////////////////////////////////////////////////////////////////////////////////////////////////

/// The provider's response for one symbol, at one point in time.
///
/// ```json
/// {
///     "records": {
///         "data": [
///             {
///                 "strikePrice": 24000,
///                 "expiryDate": "28-Nov-2024",
///                 "CE": { "openInterest": 1520, "lastPrice": 112.4, ... },
///                 "PE": { "openInterest": 980, "lastPrice": 97.05, ... }
///             },
///             // ...
///         ],
///         // ...
///     },
///     "filtered": { ... }
/// }
/// ```
///
/// Only the `records.data` path is required; each element is kept untyped so that one odd
/// record cannot spoil the rest of the document.
#[derive(Deserialize, Debug, Clone)]
pub struct RawSnapshot {
    pub records: Records,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Records {
    pub data: Vec<Value>,
}

impl RawSnapshot {
    pub fn from_value(document: &Value) -> serde_json::Result<Self> {
        Self::deserialize(document)
    }

    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Strike records in source order; elements that do not read as a strike record are
    /// skipped.
    pub fn strikes(&self) -> impl Iterator<Item = StrikeRecord> + '_ {
        self.records
            .data
            .iter()
            .enumerate()
            .filter_map(|(i, value)| match StrikeRecord::deserialize(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    trace!("skipping strike record #{i}: {e}");
                    None
                }
            })
    }
}

/// One element of `records.data`.
#[derive(Deserialize, Debug, Clone)]
#[serde(try_from = "RawStrike")]
pub struct StrikeRecord {
    pub strike_price: f64,
    pub expiry_date: String,
    pub call: Option<SideQuote>,
    pub put: Option<SideQuote>,
}

impl StrikeRecord {
    pub fn expiry(&self) -> Option<NaiveDate> {
        parse_expiry(&self.expiry_date)
    }
}

// The provider has spelled the expiry key both ways; each spelling gets its own field, so a
// record carrying both is still read.
#[derive(Deserialize)]
struct RawStrike {
    #[serde(rename = "strikePrice", deserialize_with = "de_f64")]
    strike_price: f64,

    #[serde(rename = "expiryDate")]
    expiry_date: Option<String>,

    #[serde(rename = "expiryDates")]
    expiry_dates: Option<String>,

    #[serde(rename = "CE", default, deserialize_with = "de_side")]
    call: Option<SideQuote>,

    #[serde(rename = "PE", default, deserialize_with = "de_side")]
    put: Option<SideQuote>,
}

impl TryFrom<RawStrike> for StrikeRecord {
    type Error = String;

    fn try_from(raw: RawStrike) -> Result<Self, Self::Error> {
        let expiry_date = raw
            .expiry_date
            .or(raw.expiry_dates)
            .ok_or_else(|| "missing field `expiryDate`".to_string())?;
        Ok(Self {
            strike_price: raw.strike_price,
            expiry_date,
            call: raw.call,
            put: raw.put,
        })
    }
}

/// Call-side or put-side figures at one strike.
///
/// Every value is optional on its own: `None` means the provider did not report it, which is
/// not the same as a reported `0`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(from = "RawSide")]
pub struct SideQuote {
    #[serde(rename = "openInterest")]
    pub open_interest: Option<f64>,

    #[serde(rename = "changeinOpenInterest")]
    pub change_in_oi: Option<f64>,

    #[serde(rename = "lastPrice")]
    pub last_price: Option<f64>,

    #[serde(rename = "impliedVolatility")]
    pub implied_volatility: Option<f64>,

    #[serde(rename = "volume")]
    pub volume: Option<f64>,

    #[serde(rename = "bidQty")]
    pub bid_qty: Option<f64>,

    #[serde(rename = "bid")]
    pub bid: Option<f64>,

    #[serde(rename = "ask")]
    pub ask: Option<f64>,

    #[serde(rename = "askQty")]
    pub ask_qty: Option<f64>,
}

// Every provider spelling in its own field; the short spelling wins when both are reported.
#[derive(Deserialize)]
struct RawSide {
    #[serde(rename = "openInterest", default, deserialize_with = "de_opt_f64")]
    open_interest: Option<f64>,

    #[serde(rename = "changeinOpenInterest", default, deserialize_with = "de_opt_f64")]
    change_in_oi: Option<f64>,

    #[serde(rename = "lastPrice", default, deserialize_with = "de_opt_f64")]
    last_price: Option<f64>,

    #[serde(rename = "impliedVolatility", default, deserialize_with = "de_opt_f64")]
    implied_volatility: Option<f64>,

    #[serde(rename = "volume", default, deserialize_with = "de_opt_f64")]
    volume: Option<f64>,

    #[serde(rename = "totalTradedVolume", default, deserialize_with = "de_opt_f64")]
    total_traded_volume: Option<f64>,

    #[serde(rename = "bidQty", default, deserialize_with = "de_opt_f64")]
    bid_qty: Option<f64>,

    #[serde(rename = "bid", default, deserialize_with = "de_opt_f64")]
    bid: Option<f64>,

    #[serde(rename = "bidprice", default, deserialize_with = "de_opt_f64")]
    bidprice: Option<f64>,

    #[serde(rename = "ask", default, deserialize_with = "de_opt_f64")]
    ask: Option<f64>,

    #[serde(rename = "askPrice", default, deserialize_with = "de_opt_f64")]
    ask_price: Option<f64>,

    #[serde(rename = "askQty", default, deserialize_with = "de_opt_f64")]
    ask_qty: Option<f64>,
}

impl From<RawSide> for SideQuote {
    fn from(raw: RawSide) -> Self {
        Self {
            open_interest: raw.open_interest,
            change_in_oi: raw.change_in_oi,
            last_price: raw.last_price,
            implied_volatility: raw.implied_volatility,
            volume: raw.volume.or(raw.total_traded_volume),
            bid_qty: raw.bid_qty,
            bid: raw.bid.or(raw.bidprice),
            ask: raw.ask.or(raw.ask_price),
            ask_qty: raw.ask_qty,
        }
    }
}
