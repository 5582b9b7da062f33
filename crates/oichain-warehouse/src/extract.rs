use crate::schema::option_chain::{RawSnapshot, SideQuote};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

///////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Expiry-filtered, per-strike table
//
///////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    /// The document has no `records.data` list; distinct from "no rows for this expiry".
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

/// One strike of one expiry, flattened.
///
/// A side that is not listed at this strike reads as [`SideQuote::default()`], i.e., every
/// value `None`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ExpiryRow {
    pub strike_price: f64,
    pub expiry_date: NaiveDate,
    pub call: SideQuote,
    pub put: SideQuote,
}

/// Rows in the order the provider listed them.
pub type ExtractionResult = Vec<ExpiryRow>;

/// Every strike of `document` expiring on `expiry`.
///
/// ```ignore
/// let doc: serde_json::Value = serde_json::from_slice(&bytes)?;
/// let rows = extract(&doc, NaiveDate::from_ymd_opt(2024, 11, 28).unwrap())?;
/// ```
///
/// Records whose expiry cannot be read are left out; only a document without the
/// `records.data` list is an error.
pub fn extract(document: &Value, expiry: NaiveDate) -> Result<ExtractionResult, ExtractError> {
    let snapshot = RawSnapshot::from_value(document)
        .map_err(|e| ExtractError::MalformedSnapshot(e.to_string()))?;
    Ok(extract_snapshot(&snapshot, expiry))
}

/// [`extract`] over raw stored bytes; bytes that are not JSON are a malformed snapshot too.
pub fn extract_bytes(bytes: &[u8], expiry: NaiveDate) -> Result<ExtractionResult, ExtractError> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| ExtractError::MalformedSnapshot(e.to_string()))?;
    extract(&document, expiry)
}

pub fn extract_snapshot(snapshot: &RawSnapshot, expiry: NaiveDate) -> ExtractionResult {
    snapshot
        .strikes()
        .filter_map(|record| {
            let Some(date) = record.expiry() else {
                trace!(
                    "strike {}: unreadable expiry date {:?}",
                    record.strike_price,
                    record.expiry_date
                );
                return None;
            };
            (date == expiry).then(|| ExpiryRow {
                strike_price: record.strike_price,
                expiry_date: date,
                call: record.call.unwrap_or_default(),
                put: record.put.unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn three_strikes() -> Value {
        json!({
            "records": {
                "timestamp": "22-Nov-2024 15:30:00",
                "data": [
                    {
                        "strikePrice": 100,
                        "expiryDate": "28-Nov-2024",
                        "CE": {
                            "openInterest": 1500,
                            "changeinOpenInterest": -20,
                            "lastPrice": 12.5,
                            "impliedVolatility": 14.2,
                            "totalTradedVolume": 3000,
                            "bidQty": 50,
                            "bidprice": 12.4,
                            "askPrice": 12.6,
                            "askQty": 75
                        },
                        "PE": {
                            "openInterest": 0,
                            "changeinOpenInterest": 0,
                            "lastPrice": 3.1,
                            "impliedVolatility": 15.0
                        }
                    },
                    {
                        "strikePrice": 105,
                        "expiryDate": "28-Nov-2024",
                        "CE": { "openInterest": 800, "lastPrice": 8.0 }
                    },
                    {
                        "strikePrice": 110,
                        "expiryDate": "05-Dec-2024",
                        "CE": { "openInterest": 10 },
                        "PE": { "openInterest": 20 }
                    }
                ]
            }
        })
    }

    #[test]
    fn test_three_strike_scenario() {
        let rows = extract(&three_strikes(), date(2024, 11, 28)).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].strike_price, 100.0);
        assert_eq!(rows[1].strike_price, 105.0);

        assert_eq!(rows[0].call.open_interest, Some(1500.0));
        assert_eq!(rows[0].call.change_in_oi, Some(-20.0));
        assert_eq!(rows[0].call.volume, Some(3000.0));
        assert_eq!(rows[0].call.bid, Some(12.4));
        assert_eq!(rows[0].call.ask_qty, Some(75.0));
        assert_eq!(rows[0].put.open_interest, Some(0.0));
        assert_eq!(rows[0].put.volume, None);

        assert_eq!(rows[1].call.open_interest, Some(800.0));
        assert_eq!(rows[1].put, SideQuote::default());
    }

    #[test]
    fn test_rows_share_the_requested_expiry() {
        let target = date(2024, 12, 5);
        let rows = extract(&three_strikes(), target).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|row| row.expiry_date == target));
    }

    #[test]
    fn test_no_matching_expiry_is_empty() {
        assert!(extract(&three_strikes(), date(2024, 11, 29)).unwrap().is_empty());
        assert!(extract(&three_strikes(), date(2023, 11, 28)).unwrap().is_empty());
        assert!(extract(&json!({ "records": { "data": [] } }), date(2024, 11, 28))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_call_side_is_absent() {
        let doc = json!({
            "records": { "data": [
                { "strikePrice": 24000, "expiryDate": "2024-11-28", "PE": { "openInterest": 7 } }
            ] }
        });
        let rows = extract(&doc, date(2024, 11, 28)).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].call, SideQuote::default());
        assert_eq!(rows[0].put.open_interest, Some(7.0));
    }

    #[test]
    fn test_side_reported_under_both_spellings_is_listed() {
        let doc = json!({
            "records": { "data": [
                {
                    "strikePrice": 100,
                    "expiryDate": "28-Nov-2024",
                    "CE": { "openInterest": 1500, "volume": 10, "totalTradedVolume": 10 }
                }
            ] }
        });
        let rows = extract(&doc, date(2024, 11, 28)).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].call.open_interest, Some(1500.0));
        assert_eq!(rows[0].call.volume, Some(10.0));
        assert_eq!(rows[0].put, SideQuote::default());
    }

    #[test]
    fn test_source_order_is_kept() {
        let doc = json!({
            "records": { "data": [
                { "strikePrice": 300, "expiryDate": "28-Nov-2024" },
                { "strikePrice": 100, "expiryDate": "28-Nov-2024" },
                { "strikePrice": 200, "expiryDate": "28-Nov-2024" }
            ] }
        });
        let strikes: Vec<f64> = extract(&doc, date(2024, 11, 28))
            .unwrap()
            .iter()
            .map(|row| row.strike_price)
            .collect();

        assert_eq!(strikes, vec![300.0, 100.0, 200.0]);
    }

    #[test]
    fn test_unreadable_expiry_only_drops_that_record() {
        let doc = json!({
            "records": { "data": [
                { "strikePrice": 100, "expiryDate": "someday" },
                { "strikePrice": 105, "expiryDate": "28-Nov-2024T" },
                { "strikePrice": 110, "expiryDate": 20241128 },
                { "strikePrice": 115, "expiryDate": "28-Nov-2024" }
            ] }
        });
        let rows = extract(&doc, date(2024, 11, 28)).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].strike_price, 115.0);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let doc = three_strikes();
        let first = extract(&doc, date(2024, 11, 28)).unwrap();
        let second = extract(&doc, date(2024, 11, 28)).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_malformed_snapshot() {
        let target = date(2024, 11, 28);
        for doc in [
            json!({}),
            json!({ "records": {} }),
            json!({ "records": { "data": "none" } }),
            json!([1, 2, 3]),
        ] {
            assert!(matches!(
                extract(&doc, target),
                Err(ExtractError::MalformedSnapshot(_))
            ));
        }
        assert!(matches!(
            extract_bytes(b"<html>Resource not found</html>", target),
            Err(ExtractError::MalformedSnapshot(_))
        ));
    }
}
