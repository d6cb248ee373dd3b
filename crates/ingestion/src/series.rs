//! Already-fetched price series.
//!
//! The engine never acquires market data itself; it receives one of these and
//! only checks that it is ordered and sane before replaying it.

use chrono::NaiveDate;
use grid_core::{DailyClose, Error, OhlcBar, Result};
use serde::{Deserialize, Serialize};

/// An ordered price series, either closes only or full daily bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "observations")]
pub enum PriceSeries {
    Daily(Vec<DailyClose>),
    Ohlc(Vec<OhlcBar>),
}

impl PriceSeries {
    /// Number of daily observations.
    pub fn len(&self) -> usize {
        match self {
            PriceSeries::Daily(points) => points.len(),
            PriceSeries::Ohlc(bars) => bars.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the series carries open/high/low.
    pub fn has_ohlc(&self) -> bool {
        matches!(self, PriceSeries::Ohlc(_))
    }

    /// Date of the observation at `index`.
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        match self {
            PriceSeries::Daily(points) => points.get(index).map(|p| p.date),
            PriceSeries::Ohlc(bars) => bars.get(index).map(|b| b.date),
        }
    }

    /// Closing price of the observation at `index`.
    pub fn close_at(&self, index: usize) -> Option<f64> {
        match self {
            PriceSeries::Daily(points) => points.get(index).map(|p| p.close),
            PriceSeries::Ohlc(bars) => bars.get(index).map(|b| b.close),
        }
    }

    /// All observation dates, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.len()).filter_map(|i| self.date_at(i)).collect()
    }

    /// Last observed closing price.
    pub fn last_close(&self) -> Option<f64> {
        self.len().checked_sub(1).and_then(|i| self.close_at(i))
    }

    /// Check ordering and price sanity.
    ///
    /// An empty series is valid; it simply produces an empty run.
    pub fn validate(&self) -> Result<()> {
        let mut prev: Option<NaiveDate> = None;
        for index in 0..self.len() {
            let date = self
                .date_at(index)
                .ok_or_else(|| Error::data(format!("missing observation {index}")))?;
            if let Some(prev) = prev {
                if date <= prev {
                    return Err(Error::data(format!(
                        "dates must be strictly increasing: {date} follows {prev} at index {index}"
                    )));
                }
            }
            prev = Some(date);

            match self {
                PriceSeries::Daily(points) => check_price(points[index].close, date, "close")?,
                PriceSeries::Ohlc(bars) => {
                    let bar = &bars[index];
                    check_price(bar.open, date, "open")?;
                    check_price(bar.high, date, "high")?;
                    check_price(bar.low, date, "low")?;
                    check_price(bar.close, date, "close")?;
                    if !bar.is_consistent() {
                        return Err(Error::data(format!(
                            "bar on {date} has high/low that do not bound open/close"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_price(price: f64, date: NaiveDate, field: &str) -> Result<()> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(Error::data(format!("{field} on {date} must be a positive number, got {price}")))
    }
}
