use crate::config::Symbol;
use crate::extract::{extract_bytes, ExpiryRow, ExtractionResult};
use crate::schema::option_chain::SideQuote;
use crate::store::SnapshotStore;
use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use std::fmt::Write;

const COLUMNS: [&str; 9] = [
    "OI", "Chg OI", "LTP", "IV", "Volume", "Bid Qty", "Bid", "Ask", "Ask Qty",
];
const WIDTH: usize = 10;

/// Rows of `symbol`'s stored snapshot for `expiry`; `None` if nothing has been saved for it yet.
///
/// A stored file that is not a readable snapshot fails with [`crate::ExtractError`] (recover it
/// with `downcast_ref`), anything else is a store I/O error.
pub async fn stored_rows(
    store: &SnapshotStore,
    symbol: &Symbol,
    expiry: NaiveDate,
) -> Result<Option<ExtractionResult>> {
    let Some(bytes) = store.read_raw(symbol).await? else {
        return Ok(None);
    };
    let rows = extract_bytes(&bytes, expiry)?;
    Ok(Some(rows))
}

/// Console table of one symbol's rows: call columns, the strike, then put columns.
///
/// Values the provider did not report print as `-`, never as `0`. No rows prints a single
/// "nothing to display" line.
pub fn render(symbol: &Symbol, expiry: NaiveDate, rows: &[ExpiryRow]) -> String {
    let mut out = String::new();
    let title = format!("{symbol} Option Chain Data for Expiry Date: {expiry}");
    let _ = writeln!(out, "{}", title.bold());

    if rows.is_empty() {
        let _ = writeln!(out, "nothing to display for {expiry}");
        return out;
    }

    // header
    let mut header = String::new();
    for col in COLUMNS {
        let _ = write!(header, "{:>WIDTH$}", format!("C {col}"));
    }
    let _ = write!(header, " | {:^WIDTH$} | ", "Strike");
    for col in COLUMNS {
        let _ = write!(header, "{:>WIDTH$}", format!("P {col}"));
    }
    let _ = writeln!(out, "{}", header.cyan());

    for row in rows {
        let mut line = String::new();
        for value in side_values(&row.call) {
            let _ = write!(line, "{:>WIDTH$}", cell(value));
        }
        let _ = write!(line, " | {:^WIDTH$} | ", num(row.strike_price));
        for value in side_values(&row.put) {
            let _ = write!(line, "{:>WIDTH$}", cell(value));
        }
        let _ = writeln!(out, "{line}");
    }

    out
}

fn side_values(side: &SideQuote) -> [Option<f64>; 9] {
    [
        side.open_interest,
        side.change_in_oi,
        side.last_price,
        side.implied_volatility,
        side.volume,
        side.bid_qty,
        side.bid,
        side.ask,
        side.ask_qty,
    ]
}

fn cell(value: Option<f64>) -> String {
    value.map(num).unwrap_or_else(|| "-".to_string())
}

fn num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;
    use tempfile::tempdir;

    fn row(strike: f64, call: SideQuote, put: SideQuote) -> ExpiryRow {
        ExpiryRow {
            strike_price: strike,
            expiry_date: NaiveDate::from_ymd_opt(2024, 11, 28).unwrap(),
            call,
            put,
        }
    }

    #[test]
    fn test_absent_values_print_as_dash() {
        let call = SideQuote {
            open_interest: Some(0.0),
            last_price: Some(12.5),
            ..SideQuote::default()
        };
        let rows = vec![row(24000.0, call, SideQuote::default())];
        let expiry = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();

        let table = render(&Symbol::index("NIFTY"), expiry, &rows);
        let line = table.lines().last().unwrap();
        let cells: Vec<&str> = line.split_whitespace().collect();

        assert!(table.contains("NIFTY Option Chain Data for Expiry Date: 2024-11-28"));
        assert_eq!(cells[0], "0");
        assert_eq!(cells[2], "12.50");
        assert!(cells.contains(&"24000"));
        // every put column is absent
        assert!(cells[cells.len() - 9..].iter().all(|c| *c == "-"));
    }

    #[test]
    fn test_empty_rows() {
        let expiry = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();
        let table = render(&Symbol::equity("HDFCBANK"), expiry, &[]);

        assert!(table.contains("nothing to display for 2024-11-28"));
        assert_eq!(table.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_stored_rows_of_missing_snapshot() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let expiry = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();

        let rows = stored_rows(&store, &Symbol::index("NIFTY"), expiry).await.unwrap();
        assert!(rows.is_none());
    }

    #[tokio::test]
    async fn test_stored_rows_of_non_json_is_malformed() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let nifty = Symbol::index("NIFTY");
        std::fs::write(store.path_for(&nifty), "<html>Access Denied</html>").unwrap();
        let expiry = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();

        let err = stored_rows(&store, &nifty, expiry).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::MalformedSnapshot(_))
        ));
    }

    #[tokio::test]
    async fn test_stored_rows_of_saved_snapshot() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let hdfc = Symbol::equity("HDFCBANK");
        let body = br#"{"records":{"data":[
            {"strikePrice":1600,"expiryDate":"28-Nov-2024","CE":{"openInterest":10}},
            {"strikePrice":1650,"expiryDate":"26-Dec-2024","CE":{"openInterest":20}}
        ]}}"#;
        store.publish(&hdfc, body).await.unwrap();
        let expiry = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();

        let rows = stored_rows(&store, &hdfc, expiry).await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].strike_price, 1600.0);
        assert_eq!(rows[0].call.open_interest, Some(10.0));
        assert_eq!(rows[0].put, SideQuote::default());
    }
}
