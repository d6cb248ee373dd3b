//! JSON loading of an already-fetched price series.
//!
//! Accepts a JSON array whose records are either `{date, close}` or
//! `{date, open, high, low, close}`. Mixing the two shapes is rejected.

use std::io::Read;

use chrono::NaiveDate;
use grid_core::{DailyClose, Error, OhlcBar, Result};
use serde::Deserialize;
use tracing::debug;

use crate::series::PriceSeries;

/// One JSON record. `open`, `high` and `low` come together or not at all.
#[derive(Debug, Deserialize)]
struct RawRecord {
    date: NaiveDate,
    close: f64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
}

enum Record {
    Daily(DailyClose),
    Ohlc(OhlcBar),
}

impl RawRecord {
    fn into_record(self, position: usize) -> Result<Record> {
        let RawRecord {
            date,
            close,
            open,
            high,
            low,
        } = self;
        match (open, high, low) {
            (None, None, None) => Ok(Record::Daily(DailyClose { date, close })),
            (Some(open), Some(high), Some(low)) => Ok(Record::Ohlc(OhlcBar {
                date,
                open,
                high,
                low,
                close,
            })),
            _ => Err(Error::data(format!(
                "record {position} ({date}) has an incomplete open/high/low set"
            ))),
        }
    }
}

/// Load and validate a price series from a JSON reader.
pub fn load_series_json<R: Read>(reader: R) -> Result<PriceSeries> {
    let records: Vec<RawRecord> = serde_json::from_reader(reader)?;
    build_series(records)
}

/// Parse and validate a price series from a JSON string.
pub fn parse_series_json(json: &str) -> Result<PriceSeries> {
    let records: Vec<RawRecord> = serde_json::from_str(json)?;
    build_series(records)
}

fn build_series(raw: Vec<RawRecord>) -> Result<PriceSeries> {
    let total = raw.len();
    let mut closes = Vec::new();
    let mut bars = Vec::new();
    for (position, record) in raw.into_iter().enumerate() {
        match record.into_record(position)? {
            Record::Daily(close) => closes.push(close),
            Record::Ohlc(bar) => bars.push(bar),
        }
    }

    let series = if bars.is_empty() {
        PriceSeries::Daily(closes)
    } else if closes.is_empty() {
        PriceSeries::Ohlc(bars)
    } else {
        return Err(Error::data(format!(
            "series mixes {} OHLC records with {} close-only records",
            bars.len(),
            total - bars.len()
        )));
    };

    series.validate()?;
    debug!(
        observations = series.len(),
        ohlc = series.has_ohlc(),
        "Loaded price series"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_daily() {
        let json = r#"[
            {"date": "2024-01-02", "close": 10.0},
            {"date": "2024-01-03", "close": 9.4}
        ]"#;
        let series = parse_series_json(json).unwrap();
        assert!(!series.has_ohlc());
        assert_eq!(series.len(), 2);
        assert_eq!(series.close_at(1), Some(9.4));
    }

    #[test]
    fn test_parse_ohlc_from_reader() {
        let json = br#"[
            {"date": "2024-01-02", "open": 10.0, "high": 10.2, "low": 9.7, "close": 9.8}
        ]"#;
        let series = load_series_json(&json[..]).unwrap();
        assert!(series.has_ohlc());
        assert_eq!(series.last_close(), Some(9.8));
    }

    #[test]
    fn test_rejects_mixed_records() {
        let json = r#"[
            {"date": "2024-01-02", "open": 10.0, "high": 10.2, "low": 9.7, "close": 9.8},
            {"date": "2024-01-03", "close": 9.4}
        ]"#;
        assert!(matches!(parse_series_json(json), Err(Error::Data(_))));
    }

    #[test]
    fn test_rejects_unordered() {
        let json = r#"[
            {"date": "2024-01-03", "close": 10.0},
            {"date": "2024-01-02", "close": 9.4}
        ]"#;
        assert!(parse_series_json(json).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_series_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_empty_array() {
        let series = parse_series_json("[]").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_rejects_incomplete_ohlc_record() {
        // Missing `low`: neither a bar nor a plain close.
        let json = r#"[
            {"date": "2024-01-02", "open": 10.0, "high": 10.2, "close": 9.8}
        ]"#;
        let err = parse_series_json(json).unwrap_err();
        assert!(matches!(err, Error::Data(_)), "{err}");
    }

    #[test]
    fn test_ignores_extra_fields() {
        let json = r#"[
            {"date": "2024-01-02", "close": 10.0, "volume": 1200}
        ]"#;
        let series = parse_series_json(json).unwrap();
        assert!(!series.has_ohlc());
    }
}
