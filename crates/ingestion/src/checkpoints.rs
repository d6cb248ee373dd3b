//! Price path reconstruction.
//!
//! Turns a price series into per-day checkpoint paths. Daily observation uses the close
//! only; intraday observation approximates the intrabar order from OHLC:
//! `open -> high -> low -> close` when the high is nearer the open, otherwise
//! `open -> low -> high -> close`. This is an approximation, not tick data.

use chrono::NaiveDate;
use grid_core::OhlcBar;
use serde::{Deserialize, Serialize};

use crate::series::PriceSeries;

/// Checkpoints closer than this collapse into one.
pub const CHECKPOINT_EPSILON: f64 = 1e-9;

/// How each day is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObservationModel {
    /// One price (the close) per day.
    #[default]
    Daily,
    /// Reconstructed OHLC checkpoints per day.
    Intraday,
}

/// Which part of the bar a checkpoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckpointKind {
    Open,
    High,
    Low,
    Close,
}

/// A single point on a day's reconstructed path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub kind: CheckpointKind,
    pub price: f64,
}

/// The monotone checkpoints of one observation day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPath {
    /// Position of the day in the series.
    pub index: usize,
    pub date: NaiveDate,
    /// Price reported for the day on curves (the close).
    pub close: f64,
    /// Chronological checkpoints, never empty.
    pub checkpoints: Vec<Checkpoint>,
}

impl DayPath {
    /// Price at the end of the day's path.
    pub fn last_price(&self) -> f64 {
        self.checkpoints.last().map(|c| c.price).unwrap_or(self.close)
    }
}

/// Reconstruct the intrabar checkpoints of one bar.
pub fn reconstruct_bar(bar: &OhlcBar) -> Vec<Checkpoint> {
    let order = if bar.high_first() {
        [
            (CheckpointKind::Open, bar.open),
            (CheckpointKind::High, bar.high),
            (CheckpointKind::Low, bar.low),
            (CheckpointKind::Close, bar.close),
        ]
    } else {
        [
            (CheckpointKind::Open, bar.open),
            (CheckpointKind::Low, bar.low),
            (CheckpointKind::High, bar.high),
            (CheckpointKind::Close, bar.close),
        ]
    };

    let mut checkpoints: Vec<Checkpoint> = Vec::with_capacity(4);
    for (kind, price) in order {
        match checkpoints.last() {
            Some(last) if (last.price - price).abs() <= CHECKPOINT_EPSILON => {}
            _ => checkpoints.push(Checkpoint { kind, price }),
        }
    }
    checkpoints
}

/// Build the per-day paths for a whole series.
///
/// A closes-only series has nothing to reconstruct, so it yields one checkpoint per day
/// under either model.
pub fn build_day_paths(series: &PriceSeries, model: ObservationModel) -> Vec<DayPath> {
    match (series, model) {
        (PriceSeries::Ohlc(bars), ObservationModel::Intraday) => bars
            .iter()
            .enumerate()
            .map(|(index, bar)| DayPath {
                index,
                date: bar.date,
                close: bar.close,
                checkpoints: reconstruct_bar(bar),
            })
            .collect(),
        _ => (0..series.len())
            .filter_map(|index| {
                let date = series.date_at(index)?;
                let close = series.close_at(index)?;
                Some(DayPath {
                    index,
                    date,
                    close,
                    checkpoints: vec![Checkpoint {
                        kind: CheckpointKind::Close,
                        price: close,
                    }],
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::DailyClose;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> OhlcBar {
        OhlcBar {
            date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            open,
            high,
            low,
            close,
        }
    }

    fn prices(checkpoints: &[Checkpoint]) -> Vec<f64> {
        checkpoints.iter().map(|c| c.price).collect()
    }

    #[test]
    fn test_high_first_order() {
        let cps = reconstruct_bar(&bar(10.0, 10.2, 9.5, 9.8));
        assert_eq!(prices(&cps), vec![10.0, 10.2, 9.5, 9.8]);
        assert_eq!(cps[1].kind, CheckpointKind::High);
    }

    #[test]
    fn test_low_first_order() {
        let cps = reconstruct_bar(&bar(10.0, 10.9, 9.9, 10.5));
        assert_eq!(prices(&cps), vec![10.0, 9.9, 10.9, 10.5]);
        assert_eq!(cps[1].kind, CheckpointKind::Low);
    }

    #[test]
    fn test_collapses_equal_checkpoints() {
        // Opens at the high and closes at the low.
        let cps = reconstruct_bar(&bar(10.0, 10.0, 9.0, 9.0));
        assert_eq!(prices(&cps), vec![10.0, 9.0]);
        assert_eq!(cps[0].kind, CheckpointKind::Open);

        let flat = reconstruct_bar(&bar(10.0, 10.0, 10.0, 10.0));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_daily_model_uses_close() {
        let series = PriceSeries::Ohlc(vec![bar(10.0, 10.2, 9.5, 9.8)]);
        let paths = build_day_paths(&series, ObservationModel::Daily);
        assert_eq!(paths.len(), 1);
        assert_eq!(prices(&paths[0].checkpoints), vec![9.8]);
        assert_eq!(paths[0].last_price(), 9.8);
    }

    #[test]
    fn test_intraday_on_closes_only() {
        let series = PriceSeries::Daily(vec![DailyClose {
            date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            close: 9.9,
        }]);
        let paths = build_day_paths(&series, ObservationModel::Intraday);
        assert_eq!(prices(&paths[0].checkpoints), vec![9.9]);
    }

    #[test]
    fn test_intraday_paths_keep_index() {
        let mut second = bar(9.8, 9.9, 9.1, 9.2);
        second.date = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let series = PriceSeries::Ohlc(vec![bar(10.0, 10.2, 9.5, 9.8), second]);
        let paths = build_day_paths(&series, ObservationModel::Intraday);
        assert_eq!(paths[1].index, 1);
        assert_eq!(paths[1].checkpoints.len(), 4);
        assert_eq!(paths[1].close, 9.2);
    }
}
