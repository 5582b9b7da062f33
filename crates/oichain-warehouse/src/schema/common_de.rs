use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strike prices arrive as numbers, though some mirrors of the option chain quote them as
/// strings, as below:
///
/// ```text
/// "strikePrice": 24000
/// "strikePrice": "24000.00"
/// ```
///
/// `de_f64` is designed to handle both.
pub fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    lenient_f64(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("ERROR! Expected a number, found {value}"))
    })
}

/// A field that may be missing, `null`, or a placeholder such as `"-"`; any of those become
/// `None`. A reported zero stays `Some(0.0)`.
///
/// Use with `#[serde(default)]`, so that a missing key also lands on `None`.
pub fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(lenient_f64(&value))
}

/// The `CE` / `PE` sub-records are objects when the contract is listed, and absent otherwise;
/// anything that is not an object is read as "not listed". An object that fails to read is an
/// error, not "not listed".
pub fn de_side<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    match value {
        Value::Object(_) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(num) => num.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

/// Formats an expiry date may take; the provider uses the first.
const DATE_FORMATS: [&str; 3] = ["%d-%b-%Y", "%Y-%m-%d", "%d %b %Y"];

/// Parse an expiry date string to a calendar date, e.g.,
/// ```text
/// 28-Nov-2024           -> 2024-11-28
/// 2024-11-28            -> 2024-11-28
/// 2024-11-28T00:00:00   -> 2024-11-28
/// ```
///
/// Returns `None` for anything else.
pub fn parse_expiry(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}
