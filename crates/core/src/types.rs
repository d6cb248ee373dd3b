//! Core data types for the grid backtesting system.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Price type with ordering support.
pub type Price = OrderedFloat<f64>;

/// Share quantity. Always a multiple of the lot unit once it reaches the ledger.
pub type Shares = u64;

/// Floor a fractional quantity to a whole number of lots.
///
/// Negative, NaN and sub-lot quantities floor to zero.
#[inline]
pub fn floor_to_lot(quantity: f64, lot_unit: Shares) -> Shares {
    if lot_unit == 0 || !quantity.is_finite() || quantity <= 0.0 {
        return 0;
    }
    let lots = (quantity / lot_unit as f64).floor();
    lots as Shares * lot_unit
}

/// Round a price to a fixed number of decimals.
#[inline]
pub fn round_price(price: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (price * scale).round() / scale
}

/// A single daily closing observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub close: f64,
}

/// Daily OHLC bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    /// Trading date.
    pub date: NaiveDate,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
}

impl OhlcBar {
    /// Whether the bar is assumed to have visited its high before its low.
    ///
    /// Heuristic: the extreme nearer the open was reached first. Ties go to the high.
    #[inline]
    pub fn high_first(&self) -> bool {
        (self.open - self.high).abs() <= (self.open - self.low).abs()
    }

    /// Whether high/low bound open and close.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.high
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
    }
}

/// Side of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Buy,
    Sell,
}

/// Direction in which price moved through a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Crossed from above (prev > level >= curr).
    Down,
    /// Crossed from below (prev < level <= curr).
    Up,
}

impl Direction {
    /// The trade side a crossing in this direction triggers.
    #[inline]
    pub fn side(self) -> Side {
        match self {
            Direction::Down => Side::Buy,
            Direction::Up => Side::Sell,
        }
    }
}

/// One of the nested grid ladders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TierClass {
    Small,
    Medium,
    Large,
}

impl TierClass {
    /// All tier classes, smallest first.
    pub const ALL: [TierClass; 3] = [TierClass::Small, TierClass::Medium, TierClass::Large];

    /// Short label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            TierClass::Small => "small",
            TierClass::Medium => "medium",
            TierClass::Large => "large",
        }
    }
}
