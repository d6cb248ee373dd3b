//! Backtest performance metrics.
//!
//! Rolls up per-day investment/value curves during a run and the final summary from the
//! transaction log and ledger at the end.

use chrono::NaiveDate;
use grid_core::{Shares, Side};
use serde::{Deserialize, Serialize};

use crate::execution::Transaction;
use crate::ledger::Ledger;

/// One point of the per-day curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// Observed closing price.
    pub price: f64,
    /// Running net investment.
    pub investment: f64,
    /// Running market value of held shares.
    pub value: f64,
    /// `value - investment`.
    pub profit: f64,
    pub total_shares: Shares,
    pub available_shares: Shares,
    pub pending_shares: Shares,
}

/// Final performance summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    /// Executed buys plus executed sells.
    pub transaction_count: u32,
    pub buy_count: u32,
    /// Executed sells, blocked triggers excluded.
    pub sell_count: u32,
    /// Sell triggers that found no available shares.
    pub blocked_count: u32,
    pub total_shares: Shares,
    pub available_shares: Shares,
    pub pending_shares: Shares,
    pub cumulative_buy_amount: f64,
    pub cumulative_sell_amount: f64,
    pub net_investment: f64,
    pub total_fees: f64,
    pub last_price: f64,
    pub current_value: f64,
    pub profit_amount: f64,
    /// Zero when net investment is not positive.
    pub profit_percentage: f64,
    pub realized_pnl: f64,
    /// Market value minus the cost basis of held shares.
    pub unrealized_pnl: f64,
    /// Average cost per held share, buy fees included.
    pub average_cost: f64,
    /// Highest net investment during the run.
    pub peak_investment: f64,
    /// Largest fall of the profit curve from a prior peak.
    pub max_drawdown: f64,
    pub observation_count: u32,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub open_lot_count: u32,
}

/// Accumulates curves during a run and produces the summary.
#[derive(Debug, Default)]
pub struct PerformanceAggregator {
    daily: Vec<DailyPoint>,
}

impl PerformanceAggregator {
    /// Create a new aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the end-of-day state.
    pub fn record_day(&mut self, date: NaiveDate, price: f64, ledger: &Ledger) {
        let investment = ledger.net_investment();
        let value = ledger.total_shares() as f64 * price;
        self.daily.push(DailyPoint {
            date,
            price,
            investment,
            value,
            profit: value - investment,
            total_shares: ledger.total_shares(),
            available_shares: ledger.available_shares(),
            pending_shares: ledger.pending_shares(),
        });
    }

    /// Calculate the summary and hand back the curves.
    pub fn finish(
        self,
        transactions: &[Transaction],
        ledger: &Ledger,
    ) -> (PerformanceSummary, Vec<DailyPoint>) {
        let mut summary = PerformanceSummary::default();

        for tx in transactions {
            match (tx.side, tx.blocked) {
                (Side::Buy, _) => summary.buy_count += 1,
                (Side::Sell, false) => summary.sell_count += 1,
                (Side::Sell, true) => summary.blocked_count += 1,
            }
        }
        summary.transaction_count = summary.buy_count + summary.sell_count;

        summary.total_shares = ledger.total_shares();
        summary.available_shares = ledger.available_shares();
        summary.pending_shares = ledger.pending_shares();
        summary.cumulative_buy_amount = ledger.cumulative_buy_amount();
        summary.cumulative_sell_amount = ledger.cumulative_sell_amount();
        summary.net_investment = ledger.net_investment();
        summary.total_fees = ledger.cumulative_fees();
        summary.realized_pnl = ledger.realized_pnl();
        summary.average_cost = ledger.average_cost();
        summary.peak_investment = ledger.peak_investment();
        summary.open_lot_count = ledger.lots().len() as u32;

        summary.last_price = self.daily.last().map(|p| p.price).unwrap_or(0.0);
        summary.current_value = ledger.total_shares() as f64 * summary.last_price;
        summary.profit_amount = summary.current_value - summary.net_investment;
        summary.profit_percentage = profit_percentage(summary.profit_amount, summary.net_investment);
        summary.unrealized_pnl =
            summary.current_value - ledger.lots().iter().map(|l| l.remaining_cost()).sum::<f64>();

        summary.max_drawdown = max_drawdown(&self.daily);
        summary.observation_count = self.daily.len() as u32;
        summary.first_date = self.daily.first().map(|p| p.date);
        summary.last_date = self.daily.last().map(|p| p.date);

        (summary, self.daily)
    }
}

/// Profit relative to net investment, in percent. Zero when nothing is invested.
pub fn profit_percentage(profit_amount: f64, net_investment: f64) -> f64 {
    if net_investment <= 0.0 {
        0.0
    } else {
        profit_amount / net_investment * 100.0
    }
}

/// Net investment recomputed from the log alone.
pub fn net_investment_from_log(transactions: &[Transaction]) -> f64 {
    -transactions
        .iter()
        .filter(|tx| !tx.blocked)
        .map(Transaction::cash_flow)
        .sum::<f64>()
}

/// Largest peak-to-trough fall of the profit curve.
pub fn max_drawdown(daily: &[DailyPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for point in daily {
        peak = peak.max(point.profit);
        worst = worst.max(peak - point.profit);
    }
    worst
}
