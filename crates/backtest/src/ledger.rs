//! Lot-level position ledger.
//!
//! Tracks open lots, settlement buckets, and the cumulative cash flows of one run.

use chrono::NaiveDate;
use grid_core::{Price, Shares, TierClass};
use serde::{Deserialize, Serialize};

use crate::settlement::SettlementLedger;

/// Settlement state of a lot on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LotState {
    /// Bought, not yet settled.
    Pending,
    /// Settled and untouched.
    Available,
    /// Settled and partly sold.
    PartiallySold,
}

/// A discrete purchase, tracked until fully sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    /// Run-unique, increasing in purchase order.
    pub id: u64,
    /// Remaining shares.
    pub shares: Shares,
    pub original_shares: Shares,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
    pub unlock_date: NaiveDate,
    pub tier: TierClass,
    /// Grid offset of the level the lot was bought at.
    pub offset: f64,
    /// Grid offset at which fixed matching sells this lot: buy offset plus one tier width.
    pub target_sell_offset: f64,
    /// Buy fee paid for the whole lot.
    pub buy_fee: f64,
}

impl Lot {
    /// Whether the lot may be sold on `date`.
    #[inline]
    pub fn is_settled(&self, date: NaiveDate) -> bool {
        self.unlock_date <= date
    }

    pub fn state(&self, date: NaiveDate) -> LotState {
        if !self.is_settled(date) {
            LotState::Pending
        } else if self.shares < self.original_shares {
            LotState::PartiallySold
        } else {
            LotState::Available
        }
    }

    /// Cost of one share including its share of the buy fee.
    pub fn cost_per_share(&self) -> f64 {
        if self.original_shares == 0 {
            return self.purchase_price;
        }
        self.purchase_price + self.buy_fee / self.original_shares as f64
    }

    /// Cost basis of the remaining shares.
    pub fn remaining_cost(&self) -> f64 {
        self.shares as f64 * self.cost_per_share()
    }
}

/// Shares taken from one lot by a sell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotDraw {
    pub lot_id: u64,
    pub shares: Shares,
    pub cost: f64,
}

/// Point-in-time view of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub total_shares: Shares,
    pub available_shares: Shares,
    pub pending_shares: Shares,
    pub cumulative_buy_amount: f64,
    pub cumulative_sell_amount: f64,
    pub cumulative_fees: f64,
    pub net_investment: f64,
    pub realized_pnl: f64,
    pub open_lots: usize,
}

/// The ledger of one run.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    settlement: SettlementLedger,
    lots: Vec<Lot>,
    next_lot_id: u64,
    /// Cash paid for buys, fees included.
    cumulative_buy_amount: f64,
    /// Cash received from sells, fees deducted.
    cumulative_sell_amount: f64,
    cumulative_fees: f64,
    realized_pnl: f64,
    peak_investment: f64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_shares(&self) -> Shares {
        self.settlement.total()
    }

    pub fn available_shares(&self) -> Shares {
        self.settlement.available()
    }

    pub fn pending_shares(&self) -> Shares {
        self.settlement.pending()
    }

    pub fn settlement(&self) -> &SettlementLedger {
        &self.settlement
    }

    /// Open lots, oldest first.
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn cumulative_buy_amount(&self) -> f64 {
        self.cumulative_buy_amount
    }

    pub fn cumulative_sell_amount(&self) -> f64 {
        self.cumulative_sell_amount
    }

    pub fn cumulative_fees(&self) -> f64 {
        self.cumulative_fees
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Highest net investment seen so far.
    pub fn peak_investment(&self) -> f64 {
        self.peak_investment
    }

    /// Net cash committed: buys paid minus sells received.
    pub fn net_investment(&self) -> f64 {
        self.cumulative_buy_amount - self.cumulative_sell_amount
    }

    /// Lowest purchase price among open lots.
    pub fn lowest_held_cost(&self) -> Option<f64> {
        self.lots
            .iter()
            .map(|lot| Price::from(lot.purchase_price))
            .min()
            .map(|p| p.into_inner())
    }

    /// Average cost per held share, fees included.
    pub fn average_cost(&self) -> f64 {
        let total = self.total_shares();
        if total == 0 {
            return 0.0;
        }
        self.lots.iter().map(Lot::remaining_cost).sum::<f64>() / total as f64
    }

    /// Release settlement due on `date`.
    pub fn settle(&mut self, date: NaiveDate) -> Shares {
        self.settlement.release(date)
    }

    /// Record a buy and open a lot for it. Returns the new lot id.
    #[allow(clippy::too_many_arguments)]
    pub fn record_buy(
        &mut self,
        shares: Shares,
        price: f64,
        fee: f64,
        date: NaiveDate,
        unlock_date: NaiveDate,
        tier: TierClass,
        offset: f64,
        target_sell_offset: f64,
    ) -> u64 {
        let id = self.next_lot_id;
        self.next_lot_id += 1;

        self.settlement.record_purchase(shares, unlock_date);
        self.cumulative_buy_amount += shares as f64 * price + fee;
        self.cumulative_fees += fee;
        self.peak_investment = self.peak_investment.max(self.net_investment());

        self.lots.push(Lot {
            id,
            shares,
            original_shares: shares,
            purchase_price: price,
            purchase_date: date,
            unlock_date,
            tier,
            offset,
            target_sell_offset,
            buy_fee: fee,
        });
        id
    }

    /// Take up to `shares` from one settled lot.
    ///
    /// The lot is removed once empty. Returns `None` when the lot does not exist, is not
    /// settled on `date`, or nothing could be taken.
    pub fn draw_from_lot(&mut self, lot_id: u64, shares: Shares, date: NaiveDate) -> Option<LotDraw> {
        let position = self.lots.iter().position(|lot| lot.id == lot_id)?;
        let lot = &self.lots[position];
        if !lot.is_settled(date) {
            return None;
        }
        let wanted = shares.min(lot.shares);
        let taken = self.settlement.consume(wanted);
        if taken == 0 {
            return None;
        }

        let lot = &mut self.lots[position];
        let cost = taken as f64 * lot.cost_per_share();
        lot.shares -= taken;
        if lot.shares == 0 {
            self.lots.remove(position);
        }
        Some(LotDraw {
            lot_id,
            shares: taken,
            cost,
        })
    }

    /// Take `shares` from settled lots, oldest first.
    pub fn draw_oldest_first(&mut self, shares: Shares, date: NaiveDate) -> Vec<LotDraw> {
        let settled: Vec<u64> = self
            .lots
            .iter()
            .filter(|lot| lot.is_settled(date))
            .map(|lot| lot.id)
            .collect();

        let mut remaining = shares;
        let mut draws = Vec::new();
        for lot_id in settled {
            if remaining == 0 {
                break;
            }
            if let Some(draw) = self.draw_from_lot(lot_id, remaining, date) {
                remaining -= draw.shares;
                draws.push(draw);
            }
        }
        draws
    }

    /// Book the cash side of a sell whose shares were already drawn.
    pub fn record_sell(&mut self, gross: f64, fee: f64, cost: f64) -> f64 {
        let net = gross - fee;
        let pnl = net - cost;
        self.cumulative_sell_amount += net;
        self.cumulative_fees += fee;
        self.realized_pnl += pnl;
        pnl
    }

    /// Whether share buckets agree with each other and with the open lots.
    pub fn is_consistent(&self, date: NaiveDate) -> bool {
        let lot_total: Shares = self.lots.iter().map(|l| l.shares).sum();
        let lot_settled: Shares = self
            .lots
            .iter()
            .filter(|l| l.is_settled(date))
            .map(|l| l.shares)
            .sum();
        self.settlement.is_consistent()
            && lot_total == self.total_shares()
            && lot_settled == self.available_shares()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            total_shares: self.total_shares(),
            available_shares: self.available_shares(),
            pending_shares: self.pending_shares(),
            cumulative_buy_amount: self.cumulative_buy_amount,
            cumulative_sell_amount: self.cumulative_sell_amount,
            cumulative_fees: self.cumulative_fees,
            net_investment: self.net_investment(),
            realized_pnl: self.realized_pnl,
            open_lots: self.lots.len(),
        }
    }
}
