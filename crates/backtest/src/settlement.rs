//! T+1 settlement.
//!
//! Shares bought on an observation day stay pending until the first observation whose
//! date is strictly after the purchase date. Release happens at the start of a day,
//! before that day's crossings are evaluated.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use grid_core::Shares;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordered distinct observation dates of a series.
#[derive(Debug, Clone, Default)]
pub struct SettlementCalendar {
    dates: Vec<NaiveDate>,
}

impl SettlementCalendar {
    /// Build from series dates. Input order is not assumed.
    pub fn new(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort();
        dates.dedup();
        Self { dates }
    }

    /// Unlock date for a purchase made on `purchase_date`.
    ///
    /// The next observation date after the purchase. A purchase on the last observation
    /// gets the calendar day after it, which the run never reaches, so the lot stays
    /// pending until the run ends.
    pub fn unlock_date(&self, purchase_date: NaiveDate) -> NaiveDate {
        let next = self.dates.partition_point(|d| *d <= purchase_date);
        self.dates
            .get(next)
            .copied()
            .or_else(|| purchase_date.succ_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Share buckets of a single position.
///
/// Invariant: `total == available + pending()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementLedger {
    total: Shares,
    available: Shares,
    pending_by_unlock: BTreeMap<NaiveDate, Shares>,
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Shares {
        self.total
    }

    pub fn available(&self) -> Shares {
        self.available
    }

    /// Shares still waiting for settlement.
    pub fn pending(&self) -> Shares {
        self.pending_by_unlock.values().sum()
    }

    /// Pending shares grouped by unlock date.
    pub fn pending_by_unlock(&self) -> &BTreeMap<NaiveDate, Shares> {
        &self.pending_by_unlock
    }

    /// Record freshly bought shares, sellable from `unlock_date`.
    pub fn record_purchase(&mut self, shares: Shares, unlock_date: NaiveDate) {
        if shares == 0 {
            return;
        }
        self.total += shares;
        *self.pending_by_unlock.entry(unlock_date).or_insert(0) += shares;
    }

    /// Move everything unlocking on or before `date` to available.
    ///
    /// Returns the number of shares released.
    pub fn release(&mut self, date: NaiveDate) -> Shares {
        let still_pending = match date.succ_opt() {
            Some(next) => self.pending_by_unlock.split_off(&next),
            None => BTreeMap::new(),
        };
        let released: Shares = std::mem::replace(&mut self.pending_by_unlock, still_pending)
            .values()
            .sum();
        if released > 0 {
            self.available += released;
            debug!(%date, released, available = self.available, "Settled shares");
        }
        released
    }

    /// Remove sold shares from the available bucket.
    ///
    /// Never takes more than is available; returns the quantity actually removed.
    pub fn consume(&mut self, shares: Shares) -> Shares {
        let taken = shares.min(self.available);
        self.available -= taken;
        self.total -= taken;
        taken
    }

    /// Whether the bucket invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.total == self.available + self.pending()
    }
}
